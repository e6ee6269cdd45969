use thiserror::Error;

/// Errors that can occur when talking to the message queue
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to resolve queue {0}: {1}")]
    ResolveError(String, String),

    #[error("Failed to receive messages: {0}")]
    ReceiveError(String),

    #[error("Failed to delete message: {0}")]
    DeleteError(String),

    #[error("Receipt handle is not valid: {0}")]
    InvalidReceipt(String),

    #[error("Queue configuration error: {0}")]
    Configuration(String),
}
