//! Error types for the Sarissa query cache.
//!
//! All fallible operations return [`SarissaError`]. Note that a cache miss is
//! never an error: lookups return `Option` and admissions return `bool`.
//! Errors are reserved for broken invariants (corrupt frame data), invalid
//! configuration and I/O around the command line tool.
//!
//! # Examples
//!
//! ```
//! use sarissa_qcache::error::{Result, SarissaError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SarissaError::invalid_config("max_bytes overflow"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for query cache operations.
#[derive(Error, Debug)]
pub enum SarissaError {
    /// I/O errors (config files, output).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Compressed match data failed to decode.
    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    /// Configuration could not be accepted.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Errors raised by a live ranker feeding the cache.
    #[error("Ranker error: {0}")]
    Ranker(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SarissaError.
pub type Result<T> = std::result::Result<T, SarissaError>;

impl SarissaError {
    /// Create a new corruption error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        SarissaError::Corrupt(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SarissaError::InvalidConfig(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        SarissaError::InvalidOperation(msg.into())
    }

    /// Create a new ranker error.
    pub fn ranker<S: Into<String>>(msg: S) -> Self {
        SarissaError::Ranker(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SarissaError::Other(msg.into())
    }

    /// Whether this error reports damaged cache data.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SarissaError::Corrupt(_))
    }
}
