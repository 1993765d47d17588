//! Error types for the Crosswalk library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Crosswalk operations.
///
/// Failed lookups are deliberately absent here: a row that resolves to
/// nothing is recorded in the dataset (`"Lookup Flag"`, `"ENF"` sentinel)
/// and never aborts a run.
#[derive(Debug, Error)]
pub enum CrosswalkError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid catalog, path, or run configuration. Fatal before any row
    /// is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required column is absent from a loaded table or dataset.
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    /// A write target is held open elsewhere. Checked up front, before any
    /// mutation is attempted.
    #[error("File is locked (open in another program?): '{0}'")]
    Locked(PathBuf),

    /// Empty file or no data to resolve.
    #[error("Empty data: {0}")]
    EmptyData(String),
}

/// Result type alias for Crosswalk operations.
pub type Result<T> = std::result::Result<T, CrosswalkError>;
