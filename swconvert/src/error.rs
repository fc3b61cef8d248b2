use mstorage::errors::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no converter supports profile '{profile}' and entity '{entity}'")]
    ConverterNotFound { profile: String, entity: String },

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
