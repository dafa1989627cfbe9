//! Connection lifecycle: opening a database file in one of three modes.

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{OpenError, QueryError};

/// How a database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Reads only. The file must already exist.
    ReadOnly,
    /// Reads and writes. The file must already exist.
    ReadWrite,
    /// Reads and writes, creating the file when it is missing.
    #[default]
    Create,
}

impl OpenMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            OpenMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::Create => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }

    /// Whether this mode may create a missing file.
    pub fn creates(self) -> bool {
        matches!(self, OpenMode::Create)
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, OpenMode::ReadOnly)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpenMode::ReadOnly => "read-only",
            OpenMode::ReadWrite => "read-write",
            OpenMode::Create => "create",
        })
    }
}

/// An open SQLite database handle.
///
/// The handle is owned by whoever opened it and is closed when dropped, or
/// explicitly through [`Connection::close`] when the caller wants to see a
/// close failure. It is not meant to be shared across threads without
/// external locking.
pub struct Connection {
    inner: rusqlite::Connection,
    mode: OpenMode,
    path: PathBuf,
}

impl Connection {
    /// Opens the database at `path` in the given mode.
    ///
    /// `ReadOnly` and `ReadWrite` fail with [`OpenError::NotFound`] when the
    /// file is missing. `Create` creates it, or opens an existing file as-is.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, OpenError> {
        let path = path.as_ref();
        if !mode.creates() && !path.exists() {
            return Err(OpenError::NotFound(path.to_path_buf()));
        }

        let inner = rusqlite::Connection::open_with_flags(path, mode.flags())?;
        info!(path = %path.display(), %mode, "opened sqlite database");
        Ok(Self {
            inner,
            mode,
            path: path.to_path_buf(),
        })
    }

    /// Opens a private in-memory database with `Create` semantics.
    pub fn open_in_memory() -> Result<Self, OpenError> {
        let inner = rusqlite::Connection::open_in_memory()?;
        debug!("opened in-memory sqlite database");
        Ok(Self {
            inner,
            mode: OpenMode::Create,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Closes the handle, reporting any failure the engine raises while
    /// releasing it.
    pub fn close(self) -> Result<(), QueryError> {
        let path = self.path;
        self.inner.close().map_err(|(_, err)| QueryError::from(err))?;
        debug!(path = %path.display(), "closed sqlite database");
        Ok(())
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn raw(&self) -> &rusqlite::Connection {
        &self.inner
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
