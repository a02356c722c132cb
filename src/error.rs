//! Error types for settings-records

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for settings-records operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for settings-records
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata of '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to change permissions of '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Database Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Schema version '{version}' failed: {source}")]
    Migration {
        version: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Schema version '{0}' is listed more than once")]
    DuplicateVersion(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Background writer is no longer running")]
    WriterClosed,

    #[error("Failed to start background thread: {0}")]
    Thread(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid store name: {0}")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error can only happen while opening a store
    #[must_use]
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            Error::DirectoryCreate { .. }
                | Error::Open { .. }
                | Error::Migration { .. }
                | Error::DuplicateVersion(_)
                | Error::InvalidName(_)
                | Error::Thread(_)
                | Error::Config(_)
        )
    }
}
