//! SQLite query utilities: connections, callback-driven statements,
//! paginated enumeration, schema versions and migrations.
//!
//! # Intention
//!
//! - Provide a small, synchronous API over SQLite for opening databases in
//!   an explicit mode and running statements with bind, row and completion
//!   callbacks.
//! - Translate engine result codes into typed errors at one boundary.
//! - Sequence schema migrations around the `user_version` marker.
//!
//! # Architectural Boundaries
//!
//! - Storage, query planning and transactions belong to SQLite; nothing here
//!   reimplements them.
//! - Everything runs on the caller's thread; callbacks run on the caller's
//!   stack before the triggering call returns.

pub mod config;
pub mod connection;
pub mod database;
pub mod error;
mod executor;
pub mod migration;
mod paginate;
pub mod schema;
pub mod value;
mod version;

pub use config::SqliteConfig;
pub use connection::{Connection, OpenMode};
pub use database::Database;
pub use error::{Error, OpenError, QueryError, Result};
pub use executor::{Binder, Callbacks};
pub use migration::{run_migration, Migration, MigrationState};
pub use rusqlite::Row;
pub use schema::Schema;
pub use value::{Params, Value};
