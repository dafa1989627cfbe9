//! A database bound to one path, opening a fresh connection per call.

use tracing::debug;

use crate::config::SqliteConfig;
use crate::connection::{Connection, OpenMode};
use crate::error::{Error, QueryError, Result};
use crate::executor::Callbacks;
use crate::migration::run_migration;

/// Path-bound entry points.
///
/// Every method opens its own connection, runs one operation and drops the
/// handle before returning. Reads open the file read-only; writes open it in
/// the configured mode, so a `read_only` configuration rejects them. Use
/// [`Database::connect`] and the [`Connection`] methods when several
/// statements must share a transaction.
#[derive(Debug, Clone)]
pub struct Database {
    config: SqliteConfig,
}

impl Database {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Opens a connection in the configured mode.
    pub fn connect(&self) -> Result<Connection> {
        Ok(self.config.open()?)
    }

    fn reader(&self) -> Result<Connection> {
        debug!(path = %self.config.db_path.display(), "opening reader");
        Ok(self.config.open_as(OpenMode::ReadOnly)?)
    }

    /// Runs a read-only statement on a read-only connection.
    pub fn query(&self, sql: &str, callbacks: Callbacks<'_>) -> Result<()> {
        Ok(self.reader()?.query(sql, callbacks)?)
    }

    /// Runs a read/write statement on a connection in the configured mode.
    pub fn write(&self, sql: &str, callbacks: Callbacks<'_>) -> Result<()> {
        Ok(self.connect()?.execute(sql, callbacks)?)
    }

    /// Enumerates `base_query` in pages of the configured page size.
    pub fn enumerate(
        &self,
        base_query: &str,
        count_query: &str,
        callbacks: Callbacks<'_>,
    ) -> Result<()> {
        let conn = self.reader()?;
        Ok(conn.enumerate(base_query, count_query, self.config.page_size, callbacks)?)
    }

    pub fn version(&self) -> Result<i32> {
        Ok(self.reader()?.version()?)
    }

    pub fn set_version(&self, version: i32) -> Result<()> {
        Ok(self.connect()?.set_version(version)?)
    }

    /// Runs a migration whose steps reach the database through this
    /// `Database`. See [`crate::Migration::run`].
    pub fn migrate(
        &self,
        precondition: impl FnMut() -> Result<bool>,
        migrate: impl FnMut() -> Result<()>,
        verify: impl FnMut() -> Result<bool>,
        rollback: impl FnMut() -> Result<()>,
        on_complete: impl FnOnce(bool),
    ) -> Result<bool> {
        run_migration(precondition, migrate, verify, rollback, on_complete)
    }

    /// Upgrades the schema to `target`. See [`Connection::upgrade`].
    pub fn upgrade(
        &self,
        target: i32,
        script: &str,
        verify: impl FnMut(&Connection) -> std::result::Result<bool, QueryError>,
        on_complete: impl FnOnce(bool),
    ) -> Result<bool> {
        let conn = self.connect()?;
        conn.upgrade(target, script, verify, on_complete)
            .map_err(Error::from)
    }
}
