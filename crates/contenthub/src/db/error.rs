//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating the database directory.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored row holds a value the model cannot represent.
    #[error("Invalid value '{value}' in column '{column}' for source {source_id}")]
    InvalidRow {
        source_id: String,
        column: &'static str,
        value: String,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
