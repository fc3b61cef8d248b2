use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite operation failed: {0}")]
    SQLite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Mapping already exists for {entity}:{old_identifier} on connection {connection_id}")]
    DuplicateMapping {
        connection_id: String,
        entity: String,
        old_identifier: String,
    },

    #[error("Mapping {mapping_id} is already resolved to {existing}, refusing to rebind to {requested}")]
    IdentifierRebind {
        mapping_id: String,
        existing: String,
        requested: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub(crate) fn poisoned(what: &str) -> Self {
        StorageError::Other(anyhow::anyhow!("{what} lock poisoned"))
    }
}
