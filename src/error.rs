//! Error types for the result transformer.
//!
//! Every failure the pipeline can surface is a variant of [`SrtError`]. Query,
//! scan and transform failures come from the core pipeline; connection and
//! configuration failures come from the surrounding setup code.

use thiserror::Error;

/// Main error type for materialization and transformation.
#[derive(Error, Debug)]
pub enum SrtError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, permission denied, rejected by the guard, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// A cell could not be captured into a `CellValue`.
    #[error("Scan error in row {row}, column '{column}': {message}")]
    Scan {
        /// Zero-based index of the row being captured.
        row: usize,
        /// Name of the offending column.
        column: String,
        /// Driver or decoder message.
        message: String,
    },

    /// A transformer could not render the result set.
    #[error("Transform error: {0}")]
    Transform(String),

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SrtError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a scan error for the given row and column.
    pub fn scan(row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            row,
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates a transform error with the given message.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Scan { .. } => "Scan Error",
            Self::Transform(_) => "Transform Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using SrtError.
pub type Result<T> = std::result::Result<T, SrtError>;
