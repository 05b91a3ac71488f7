//! # factload - delimited fact files into SQLite
//!
//! factload provides:
//! - `StoreConnection`, a SQLite session opened from a location string
//!   (`jdbc:sqlite:...`, `sqlite:...`, `:memory:` or a plain path)
//! - the `TableImporter` capability and its loaders (`TableLoader`, `ObservationLoader`)
//! - table definitions driven by configuration, with an i2b2 `observation_fact` preset
//! - a CLI and terminal UI on top of the library

pub mod table;
pub mod storage;
pub mod import;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use table::{ColumnSpec, ColumnType, TableSpec};
pub use storage::{StoreConnection, with_connection};
pub use import::{
    ImportReport, LoadOptions, ObservationLoader, RejectedRow, RowPolicy, TableImporter,
    TableLoader,
};

use std::path::PathBuf;

/// Result type alias for factload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Connectivity failures: bad location, unreachable store, misuse of a closed handle
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid store location: {0}")]
    InvalidLocation(String),

    #[error("Store unreachable at {location}: {source}")]
    Unreachable {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Connection is closed")]
    Closed,

    #[error("Failed to close connection: {0}")]
    Close(#[source] rusqlite::Error),
}

/// Data-loading failures
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Cannot read source file {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read error: {0}")]
    Read(#[source] csv::Error),

    #[error("Header error: {0}")]
    Header(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("More than {limit} rows rejected, import aborted")]
    TooManyRejected { limit: usize },

    #[error("Invalid table definition: {0}")]
    Schema(String),

    #[error("Invalid load option: {0}")]
    Options(String),

    #[error("Store write failed: {0}")]
    Write(#[from] rusqlite::Error),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Error types for factload operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
