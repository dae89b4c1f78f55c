//! Error types for segsearch.
//!
//! All fallible operations return [`SegSearchError`] through the crate-wide
//! [`Result`] alias. Two broad classes exist:
//!
//! - contract violations (unknown field, data type mismatch, malformed query
//!   buffers) reported as [`SegSearchError::Schema`],
//!   [`SegSearchError::Query`] or [`SegSearchError::InvalidArgument`];
//! - index failures reported as [`SegSearchError::Index`].
//!
//! Neither class is transient. A search is read-only, so retrying a failed
//! call against unchanged state yields the same outcome.
//!
//! # Examples
//!
//! ```
//! use segsearch::error::{SegSearchError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SegSearchError::invalid_argument("topk must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for segsearch operations.
#[derive(Error, Debug)]
pub enum SegSearchError {
    /// I/O errors (config loading)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Schema-related errors (unknown field, type mismatch)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Query-related errors (malformed query buffers, bad metric)
    #[error("Query error: {0}")]
    Query(String),

    /// Small index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Segment storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

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

/// Result type alias for operations that may fail with SegSearchError.
pub type Result<T> = std::result::Result<T, SegSearchError>;

impl SegSearchError {
    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        SegSearchError::Schema(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SegSearchError::Query(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SegSearchError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        SegSearchError::Storage(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SegSearchError::InvalidArgument(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SegSearchError::InvalidArgument(format!("Invalid configuration: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SegSearchError::Other(msg.into())
    }

    /// Whether this error signals a caller bug rather than an index failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SegSearchError::Schema(_)
                | SegSearchError::Query(_)
                | SegSearchError::InvalidArgument(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SegSearchError::schema("unknown field 7");
        assert_eq!(error.to_string(), "Schema error: unknown field 7");

        let error = SegSearchError::index("chunk 3 query failed");
        assert_eq!(error.to_string(), "Index error: chunk 3 query failed");

        let error = SegSearchError::invalid_config("chunk_size is zero");
        assert_eq!(
            error.to_string(),
            "Invalid argument: Invalid configuration: chunk_size is zero"
        );
    }

    #[test]
    fn test_contract_violation_classes() {
        assert!(SegSearchError::schema("x").is_contract_violation());
        assert!(SegSearchError::query("x").is_contract_violation());
        assert!(!SegSearchError::index("x").is_contract_violation());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = SegSearchError::from(io_error);

        match error {
            SegSearchError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
