use thiserror::Error;

pub type TabsResult<T> = Result<T, TabsError>;

/// Tab host errors
#[derive(Debug, Error)]
pub enum TabsError {
    #[error("No tab handler registered for '{0}'")]
    HandlerNotFound(String),

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Tab handler '{handler}' does not support {capability}")]
    Unsupported {
        handler: String,
        capability: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
