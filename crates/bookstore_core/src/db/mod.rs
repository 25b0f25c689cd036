//! Storage bootstrap for the bookstore backends.
//!
//! # Responsibility
//! - Open and configure embedded SQLite connections and apply migrations.
//! - Open and verify MongoDB client connections.
//!
//! # Invariants
//! - SQLite migration version is tracked via `PRAGMA user_version`.
//! - No application data is read or written before migrations succeed.
//! - A MongoDB connection is only handed out after a successful `ping`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod mongo;
mod open;

pub use mongo::{connect_mongo, MongoConnection};
pub use open::{close_db, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Mongo(mongodb::error::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Mongo(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Mongo(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<mongodb::error::Error> for DbError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Mongo(value)
    }
}
