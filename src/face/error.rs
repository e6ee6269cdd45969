use thiserror::Error;

/// Infrastructure failures of the face comparison capability.
///
/// Every variant is transient from the pipeline's point of view: the message
/// is left on the queue and the comparison is retried on redelivery.
#[derive(Error, Debug)]
pub enum ComparisonError {
    #[error("Face comparison throttled: {0}")]
    Throttled(String),

    #[error("Face comparison service unavailable: {0}")]
    Unavailable(String),

    #[error("Face comparison failed: {0}")]
    Service(String),

    #[error("Face comparison timed out: {0}")]
    Timeout(String),
}
