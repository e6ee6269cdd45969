use crate::db::error::DatabaseError;
use crate::db::models::{AttendanceRecord, FaceResult, NewAttendance, Subject};
use async_trait::async_trait;
use std::sync::Arc;

/// AttendanceStore trait defining the record operations the pipeline and
/// the check-in desk rely on
///
/// Every mutation is atomic: it either commits completely or leaves the
/// stored rows unchanged.
#[async_trait]
pub trait AttendanceStore: Send + Sync + 'static {
    /// Apply a face result to an attendance record and return the stored row
    ///
    /// The current row is read and the merged end state written in one
    /// transaction (see [`FaceResult::apply_to`]).
    async fn update_face_result(
        &self,
        attendance_id: i64,
        result: FaceResult,
    ) -> Result<AttendanceRecord, DatabaseError>;

    /// Flag the subject as having a reference image and mark the record that
    /// carried it verified, in one transaction
    async fn register_reference_image(
        &self,
        subject_id: i64,
        attendance_id: i64,
        image_ref: &str,
    ) -> Result<AttendanceRecord, DatabaseError>;

    /// Get or create the record of a subject for a session
    ///
    /// Returns the record and whether this call created it.
    async fn create_attendance(
        &self,
        new: NewAttendance,
    ) -> Result<(AttendanceRecord, bool), DatabaseError>;

    async fn get_attendance(&self, attendance_id: i64) -> Result<AttendanceRecord, DatabaseError>;

    async fn get_subject(&self, subject_id: i64) -> Result<Subject, DatabaseError>;

    /// Insert or replace a subject (test-only)
    #[cfg(test)]
    async fn add_subject(&self, subject: Subject) -> Result<(), DatabaseError>;
}

#[async_trait]
impl<T: AttendanceStore + ?Sized> AttendanceStore for Arc<T> {
    async fn update_face_result(
        &self,
        attendance_id: i64,
        result: FaceResult,
    ) -> Result<AttendanceRecord, DatabaseError> {
        (**self).update_face_result(attendance_id, result).await
    }

    async fn register_reference_image(
        &self,
        subject_id: i64,
        attendance_id: i64,
        image_ref: &str,
    ) -> Result<AttendanceRecord, DatabaseError> {
        (**self)
            .register_reference_image(subject_id, attendance_id, image_ref)
            .await
    }

    async fn create_attendance(
        &self,
        new: NewAttendance,
    ) -> Result<(AttendanceRecord, bool), DatabaseError> {
        (**self).create_attendance(new).await
    }

    async fn get_attendance(&self, attendance_id: i64) -> Result<AttendanceRecord, DatabaseError> {
        (**self).get_attendance(attendance_id).await
    }

    async fn get_subject(&self, subject_id: i64) -> Result<Subject, DatabaseError> {
        (**self).get_subject(subject_id).await
    }

    #[cfg(test)]
    async fn add_subject(&self, subject: Subject) -> Result<(), DatabaseError> {
        (**self).add_subject(subject).await
    }
}
