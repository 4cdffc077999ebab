use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unrecognized action: {0}")]
    UnknownAction(String),

    #[error("Unknown migration version: {0}")]
    UnknownVersion(String),

    #[error("Migration version already registered: {0}")]
    DuplicateVersion(String),

    #[error("Migration marker error: {0}")]
    Marker(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// True when a single-record fetch found no rows.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
