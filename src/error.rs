//! Error types for opening databases and running statements.
//!
//! Engine result codes are translated here, once, at the `rusqlite`
//! boundary. Everything above this module matches on the typed variants.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Failure to open a database handle.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The file does not exist and the open mode does not create it.
    #[error("database file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The engine rejected the open (corrupt file, permissions, locking).
    #[error("sqlite refused to open database (code {code}): {message}")]
    EngineFailure { code: i32, message: String },

    /// A client-side failure that carries no engine code, such as a path
    /// containing an interior NUL.
    #[error("sqlite client error: {0}")]
    Client(#[source] rusqlite::Error),

    /// The configured schema could not be applied to a new database.
    #[error("failed to bootstrap schema: {0}")]
    Bootstrap(#[source] QueryError),
}

impl From<rusqlite::Error> for OpenError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, message) => OpenError::EngineFailure {
                code: e.extended_code,
                message: message.unwrap_or_else(|| e.to_string()),
            },
            other => OpenError::Client(other),
        }
    }
}

/// Failure while preparing, binding or stepping a statement.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Malformed SQL or a reference to something the schema does not have.
    #[error("failed to prepare statement (code {code}): {message}")]
    Prepare { code: i32, message: String },

    /// A UNIQUE, NOT NULL, CHECK or foreign key constraint rejected a write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A write was attempted through a read-only connection or execution.
    #[error("attempt to write through a read-only connection")]
    ReadOnlyViolation,

    /// The bind callback bound a different number of parameters than the
    /// statement declares.
    #[error("statement expects {expected} parameter(s) but {bound} were bound")]
    ParameterMismatch { expected: usize, bound: usize },

    /// `bind_named` was given a name the statement does not declare.
    #[error("statement has no parameter named {0}")]
    UnknownParameter(String),

    /// Pagination requires at least one row per page.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// Any other engine-reported failure.
    #[error("sqlite error (code {code}): {message}")]
    EngineFailure { code: i32, message: String },

    /// A client-side failure without an engine code, e.g. reading a column
    /// into an incompatible type.
    #[error("sqlite client error: {0}")]
    Client(#[source] rusqlite::Error),
}

impl QueryError {
    /// Maps an error raised by `prepare` into [`QueryError::Prepare`].
    pub(crate) fn prepare(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, message) => QueryError::Prepare {
                code: e.extended_code,
                message: message.unwrap_or_else(|| e.to_string()),
            },
            other => QueryError::from(other),
        }
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, message) => match e.code {
                ErrorCode::ConstraintViolation => {
                    QueryError::ConstraintViolation(message.unwrap_or_else(|| e.to_string()))
                }
                ErrorCode::ReadOnly => QueryError::ReadOnlyViolation,
                _ => QueryError::EngineFailure {
                    code: e.extended_code,
                    message: message.unwrap_or_else(|| e.to_string()),
                },
            },
            other => QueryError::Client(other),
        }
    }
}

/// Either kind of failure, for operations that open their own connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
