//! Error types for the swap engine

use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Batch optimization already in progress")]
    BatchInProgress,
}

impl SwapError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        SwapError::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        SwapError::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        SwapError::Internal(msg.into())
    }
}

/// Result type alias for engine operations
pub type SwapResult<T> = Result<T, SwapError>;
