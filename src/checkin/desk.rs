use crate::checkin::error::CheckInError;
use crate::db::{
    AttendanceRecord, AttendanceStore, FaceRecognitionStatus, Location, NewAttendance, Subject,
};
use crate::key::ObjectKey;
use crate::s3::Storage;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use crate::db::initial_face_state;

/// A subject presenting itself for a session
///
/// Token and secret checks happen before a request reaches the desk.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInRequest {
    pub session_id: i64,
    pub subject_id: i64,
    pub requires_verification: bool,
    pub location: Option<Location>,
}

/// Where and until when a client may PUT its photograph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub object_key: String,
    pub url: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckInReceipt {
    pub attendance: AttendanceRecord,
    /// Present when a photograph is still expected for this record
    pub upload: Option<UploadTarget>,
}

/// Object key a photograph for `attendance_id` must be uploaded to
///
/// A subject without a reference image uploads its baseline; everyone else
/// uploads a candidate stamped with the issuance time.
pub fn upload_key(subject: &Subject, attendance_id: i64, issued_at: DateTime<Utc>) -> ObjectKey {
    if subject.has_reference_image {
        ObjectKey::candidate(subject.id, attendance_id, issued_at.timestamp().max(0) as u64)
    } else {
        ObjectKey::reference(subject.id, attendance_id)
    }
}

/// Opens attendance records and hands out photograph upload targets
pub struct CheckInDesk<S: ?Sized, D: ?Sized> {
    storage: Arc<S>,
    store: Arc<D>,
    upload_url_ttl: Duration,
}

impl<S, D> CheckInDesk<S, D>
where
    S: Storage + ?Sized,
    D: AttendanceStore + ?Sized,
{
    pub fn new(storage: Arc<S>, store: Arc<D>, upload_url_ttl: Duration) -> Self {
        Self {
            storage,
            store,
            upload_url_ttl,
        }
    }

    pub async fn check_in(
        &self,
        request: CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckInReceipt, CheckInError> {
        let (attendance, created) = self
            .store
            .create_attendance(NewAttendance {
                session_id: request.session_id,
                subject_id: request.subject_id,
                requires_verification: request.requires_verification,
                location: request.location,
            })
            .await?;

        if !created && attendance.is_present {
            return Err(CheckInError::AlreadyPresent {
                subject_id: request.subject_id,
                session_id: request.session_id,
            });
        }

        let upload = match attendance.face_recognition_status {
            FaceRecognitionStatus::Pending | FaceRecognitionStatus::Failed => {
                Some(self.issue_upload(&attendance, now).await?)
            }
            FaceRecognitionStatus::NotRequired | FaceRecognitionStatus::Success => None,
        };

        info!(
            "Subject {} checked in to session {} (attendance {}, {})",
            attendance.subject_id,
            attendance.session_id,
            attendance.id,
            attendance.face_recognition_status
        );
        Ok(CheckInReceipt { attendance, upload })
    }

    async fn issue_upload(
        &self,
        attendance: &AttendanceRecord,
        now: DateTime<Utc>,
    ) -> Result<UploadTarget, CheckInError> {
        let subject = self.store.get_subject(attendance.subject_id).await?;
        let object_key = upload_key(&subject, attendance.id, now).to_string();
        let url = self
            .storage
            .presign_upload(&object_key, self.upload_url_ttl)
            .await?;

        debug!("Issued upload target {} for attendance {}", object_key, attendance.id);
        Ok(UploadTarget {
            object_key,
            url,
            expires_in: self.upload_url_ttl,
        })
    }
}
