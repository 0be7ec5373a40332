//! Error types for evalkit-log

use thiserror::Error;

/// Errors raised while reading or writing a result log.
#[derive(Error, Debug)]
pub enum LogError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV (unequal field counts, bad numbers, unreadable bytes)
    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// Header does not name a column every record needs
    #[error("header is missing required column '{column}'")]
    MissingColumn { column: String },

    /// A field parsed but holds a value the record model rejects
    #[error("line {line}: invalid {column}: {reason}")]
    InvalidField {
        line: u64,
        column: &'static str,
        reason: String,
    },

    /// Existing log was not written with the standard column order
    #[error("log header '{found}' does not match '{expected}'; refusing to append")]
    UnexpectedHeader { found: String, expected: String },
}

/// Result type for log operations
pub type Result<T> = std::result::Result<T, LogError>;
