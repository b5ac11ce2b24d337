//! Error types for SQLDeck

use thiserror::Error;

/// Core error type for SQLDeck operations
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution context error: {0}")]
    ExecutionContext(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for SQLDeck operations
pub type Result<T> = std::result::Result<T, DeckError>;
