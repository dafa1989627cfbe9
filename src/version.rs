//! The schema version marker, kept in SQLite's `user_version` header field.

use tracing::debug;

use crate::connection::Connection;
use crate::error::QueryError;

impl Connection {
    /// Reads the schema version. A freshly created database reports 0.
    pub fn version(&self) -> Result<i32, QueryError> {
        let version = self
            .raw()
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    /// Writes the schema version in a single engine-level write.
    ///
    /// Not wrapped in a transaction here; callers that need it atomic with
    /// their schema changes run it inside their own.
    pub fn set_version(&self, version: i32) -> Result<(), QueryError> {
        if self.mode().is_read_only() {
            return Err(QueryError::ReadOnlyViolation);
        }
        self.raw().pragma_update(None, "user_version", version)?;
        debug!(path = %self.path().display(), version, "updated schema version");
        Ok(())
    }
}
