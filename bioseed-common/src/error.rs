//! Common error types for bioseed

use thiserror::Error;

/// Common result type for bioseed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the bioseed crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error, used for persisted curves
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller-supplied value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record lacks a field required by the operation it was handed to
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A keyed write touched zero or several rows instead of exactly one
    #[error("Consistency failure: {0}")]
    Consistency(String),

    /// Persisted column content could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
