//! SQL editor errors

use thiserror::Error;

pub type DataSourceResult<T> = Result<T, DataSourceError>;

/// Data source errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("No data source provider registered for '{0}'")]
    ProviderNotFound(String),

    #[error("Invalid editor id '{0}'")]
    InvalidEditorId(String),

    #[error("Data source is read-only")]
    Readonly,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
