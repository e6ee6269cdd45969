use thiserror::Error;

/// Errors that can occur when interacting with object storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to connect to storage: {0}")]
    ConnectionError(String),

    #[error("Object with key {0} not found")]
    ObjectNotFound(String),

    #[error("Access denied for object {0}: {1}")]
    AccessDenied(String, String),

    #[error("Failed to copy object {0} to {1}: {2}")]
    CopyError(String, String, String),

    #[error("Failed to presign upload for {0}: {1}")]
    PresignError(String, String),

    #[error("Storage call timed out: {0}")]
    Timeout(String),

    #[error("Other storage error: {0}")]
    Other(#[from] anyhow::Error),
}
