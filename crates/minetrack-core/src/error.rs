//! Error types for minetrack-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using minetrack-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in minetrack-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Draft (or other local entity) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote directory or submission service error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A replica sync run is already in flight
    #[error("A directory sync is already running")]
    SyncInProgress,
}

impl Error {
    /// Whether this error comes from the storage layer itself (missing table,
    /// closed handle, I/O) rather than from the caller's input.
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::LibSql(_) | Self::Io(_))
    }

    /// Whether SQLite refused one particular row (constraint, type mismatch,
    /// oversized value) while the connection itself stays usable.
    pub fn is_record_rejection(&self) -> bool {
        use libsql::ffi::{SQLITE_CONSTRAINT, SQLITE_MISMATCH, SQLITE_TOOBIG};

        match self {
            // extended result codes carry the primary code in the low byte
            Self::LibSql(libsql::Error::SqliteFailure(code, _)) => matches!(
                code & 0xff,
                SQLITE_CONSTRAINT | SQLITE_MISMATCH | SQLITE_TOOBIG
            ),
            _ => false,
        }
    }
}
