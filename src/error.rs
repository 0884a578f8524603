//! Error types shared by stores and storage backends.

use std::io;
use thiserror::Error;

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Invalid initial state: {0}")]
    InvalidInitialState(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
