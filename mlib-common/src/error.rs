//! Common error types for MLIB

use thiserror::Error;

/// Common result type for MLIB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the service and its tools
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unique value already in use (username, file name)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External media tool could not convert a file
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
