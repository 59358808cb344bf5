// src/storage/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Catalog not found: {0}")]
    NotFound(String),

    #[error("Invalid catalog format: {0}")]
    InvalidFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
