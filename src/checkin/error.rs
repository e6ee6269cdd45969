use crate::db::DatabaseError;
use crate::s3::StorageError;
use thiserror::Error;

/// Errors returned to a subject checking in
#[derive(Error, Debug)]
pub enum CheckInError {
    #[error("Subject {subject_id} is already checked in to session {session_id}")]
    AlreadyPresent { subject_id: i64, session_id: i64 },

    #[error("Failed to record check-in: {0}")]
    Database(#[from] DatabaseError),

    #[error("Failed to issue upload URL: {0}")]
    Storage(#[from] StorageError),
}
