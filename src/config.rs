use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::connection::{Connection, OpenMode};
use crate::error::{OpenError, QueryError};
use crate::schema::Schema;

fn default_page_size() -> usize {
    100
}

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    #[serde(default)]
    pub mode: OpenMode,
    /// Rows per page for enumerations that do not pass their own size.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// How long to wait on a locked database before failing with `SQLITE_BUSY`.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    #[serde(default)]
    pub foreign_keys: bool,
    /// Applied once to a database opened in `Create` mode at version 0.
    #[serde(default)]
    pub schema: Option<Schema>,
}

impl SqliteConfig {
    /// Create a new SQLite config with path and mode
    pub fn new(db_path: impl Into<PathBuf>, mode: OpenMode) -> Self {
        Self {
            db_path: db_path.into(),
            mode,
            page_size: default_page_size(),
            busy_timeout_ms: None,
            foreign_keys: false,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Opens a connection in the configured mode, applies the connection
    /// settings and bootstraps the schema when one is configured.
    pub fn open(&self) -> Result<Connection, OpenError> {
        self.open_as(self.mode)
    }

    /// Like [`open`](Self::open) with a different mode. The schema is only
    /// bootstrapped in `Create` mode.
    pub(crate) fn open_as(&self, mode: OpenMode) -> Result<Connection, OpenError> {
        let conn = Connection::open(&self.db_path, mode)?;
        if let Some(ms) = self.busy_timeout_ms {
            conn.raw().busy_timeout(Duration::from_millis(ms))?;
        }
        if self.foreign_keys {
            conn.raw().pragma_update(None, "foreign_keys", true)?;
        }
        if let (OpenMode::Create, Some(schema)) = (mode, &self.schema) {
            bootstrap(&conn, schema).map_err(OpenError::Bootstrap)?;
        }
        Ok(conn)
    }
}

fn bootstrap(conn: &Connection, schema: &Schema) -> Result<(), QueryError> {
    if conn.version()? != 0 {
        return Ok(());
    }
    let tx = conn.raw().unchecked_transaction()?;
    tx.execute_batch(&schema.to_sql())?;
    tx.pragma_update(None, "user_version", schema.version)?;
    tx.commit()?;
    info!(
        path = %conn.path().display(),
        version = schema.version,
        tables = schema.tables.len(),
        "bootstrapped schema"
    );
    Ok(())
}
