use crate::db::{AttendanceStore, DatabaseError, FaceRecognitionStatus, FaceResult};
use crate::face::{Comparison, ComparisonError, FaceComparison, ImageRef};
use crate::key::{KeyError, ObjectKey};
use crate::pipeline::envelope::UploadEvent;
use crate::s3::{Storage, StorageError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Downstream failure while handling one upload; the message must be redelivered
#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl RouteError {
    /// Whether redelivering the event can change the outcome
    pub fn is_retryable(&self) -> bool {
        match self {
            RouteError::Database(e) => !e.is_not_found(),
            RouteError::Storage(_) | RouteError::Comparison(_) => true,
        }
    }
}

/// Why an upload was dropped without touching any record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MalformedKey(KeyError),
    AttendanceNotFound(i64),
    SubjectNotFound(i64),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MalformedKey(e) => write!(f, "{}", e),
            DropReason::AttendanceNotFound(id) => write!(f, "attendance record {} not found", id),
            DropReason::SubjectNotFound(id) => write!(f, "subject {} not found", id),
        }
    }
}

/// Terminal outcome of one upload; the message may be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A reference image was promoted and the record verified
    Registered { subject_id: i64, attendance_id: i64 },
    /// A candidate image was compared and the result stored
    Verified {
        attendance_id: i64,
        comparison: Comparison,
        status: FaceRecognitionStatus,
    },
    Dropped(DropReason),
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOutcome::Registered {
                subject_id,
                attendance_id,
            } => write!(
                f,
                "registered reference image of subject {} (attendance {})",
                subject_id, attendance_id
            ),
            RecordOutcome::Verified {
                attendance_id,
                comparison,
                status,
            } => write!(
                f,
                "attendance {} verified: {:?}, status {}",
                attendance_id, comparison, status
            ),
            RecordOutcome::Dropped(reason) => write!(f, "dropped: {}", reason),
        }
    }
}

/// Routes uploaded photographs to reference registration or verification
pub struct ImageRouter<S: ?Sized, F: ?Sized, D: ?Sized> {
    storage: Arc<S>,
    faces: Arc<F>,
    store: Arc<D>,
    call_timeout: Duration,
}

impl<S, F, D> ImageRouter<S, F, D>
where
    S: Storage + ?Sized,
    F: FaceComparison + ?Sized,
    D: AttendanceStore + ?Sized,
{
    pub fn new(storage: Arc<S>, faces: Arc<F>, store: Arc<D>, call_timeout: Duration) -> Self {
        Self {
            storage,
            faces,
            store,
            call_timeout,
        }
    }

    /// Handle one upload from start to finish
    ///
    /// Every path can be re-run with the same event: the reference copy
    /// targets a fixed key and every record write is an overwrite.
    pub async fn route(&self, event: &UploadEvent) -> Result<RecordOutcome, RouteError> {
        let key = match ObjectKey::parse(&event.object_key) {
            Ok(key) => key,
            Err(e) => {
                warn!("Dropping upload {}: {}", event, e);
                return Ok(RecordOutcome::Dropped(DropReason::MalformedKey(e)));
            }
        };

        let routed = if key.is_reference() {
            self.register_reference(event, &key).await
        } else {
            self.verify_candidate(event, &key).await
        };

        match routed {
            Err(RouteError::Database(DatabaseError::AttendanceNotFound(id))) => {
                error!(
                    "Anomaly: upload {} names attendance record {} which does not exist",
                    event, id
                );
                Ok(RecordOutcome::Dropped(DropReason::AttendanceNotFound(id)))
            }
            Err(RouteError::Database(DatabaseError::SubjectNotFound(id))) => {
                error!(
                    "Anomaly: upload {} names subject {} which does not exist",
                    event, id
                );
                Ok(RecordOutcome::Dropped(DropReason::SubjectNotFound(id)))
            }
            other => other,
        }
    }

    async fn register_reference(
        &self,
        event: &UploadEvent,
        key: &ObjectKey,
    ) -> Result<RecordOutcome, RouteError> {
        let destination = key.reference_image_key();
        debug!("Promoting {} to reference image {}", event, destination);

        bounded(
            self.call_timeout,
            self.storage
                .copy_object(&event.bucket, &event.object_key, &destination),
            StorageError::Timeout,
        )
        .await?;

        bounded(
            self.call_timeout,
            self.store
                .register_reference_image(key.subject_id, key.attendance_id, &event.object_key),
            DatabaseError::Timeout,
        )
        .await?;

        info!(
            "Registered reference image for subject {} from attendance {}",
            key.subject_id, key.attendance_id
        );
        Ok(RecordOutcome::Registered {
            subject_id: key.subject_id,
            attendance_id: key.attendance_id,
        })
    }

    async fn verify_candidate(
        &self,
        event: &UploadEvent,
        key: &ObjectKey,
    ) -> Result<RecordOutcome, RouteError> {
        let reference = ImageRef::new(event.bucket.as_str(), key.reference_image_key());
        let candidate = ImageRef::new(event.bucket.as_str(), event.object_key.as_str());
        debug!("Comparing {} against {}", candidate, reference);

        let comparison = bounded(
            self.call_timeout,
            self.faces.compare(&reference, &candidate),
            ComparisonError::Timeout,
        )
        .await?;

        let record = bounded(
            self.call_timeout,
            self.store.update_face_result(
                key.attendance_id,
                FaceResult::from_comparison(comparison, event.object_key.as_str()),
            ),
            DatabaseError::Timeout,
        )
        .await?;

        info!(
            "Attendance {} compared as {:?}; status {}, present {}",
            record.id, comparison, record.face_recognition_status, record.is_present
        );
        Ok(RecordOutcome::Verified {
            attendance_id: record.id,
            comparison,
            status: record.face_recognition_status,
        })
    }
}

/// Await `call`, mapping an elapsed `limit` to the seam's own timeout error
async fn bounded<T, E, Fut>(
    limit: Duration,
    call: Fut,
    timed_out: impl FnOnce(String) -> E,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(timed_out(format!("no response within {:?}", limit))),
    }
}
