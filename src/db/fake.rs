use crate::db::database::AttendanceStore;
use crate::db::error::DatabaseError;
use crate::db::models::{AttendanceRecord, FaceResult, NewAttendance, Subject};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct FakeTables {
    attendance: HashMap<i64, AttendanceRecord>,
    subjects: HashMap<i64, Subject>,
    next_id: i64,
}

/// A fake in-memory implementation of the AttendanceStore trait for testing
#[derive(Clone, Default)]
pub struct FakeAttendanceStore {
    tables: Arc<RwLock<FakeTables>>,
    failing_writes: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl FakeAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, replacing any record with the same id
    pub fn fake_add_attendance(&self, record: AttendanceRecord) {
        let mut tables = self.tables.write().unwrap();
        tables.next_id = tables.next_id.max(record.id);
        tables.subjects.entry(record.subject_id).or_insert_with(|| Subject::new(record.subject_id));
        tables.attendance.insert(record.id, record);
    }

    pub fn fake_add_subject(&self, subject: Subject) {
        self.tables.write().unwrap().subjects.insert(subject.id, subject);
    }

    /// The next `count` mutations fail with a connection error and change nothing
    pub fn fake_fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Number of committed mutations
    pub fn fake_write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), DatabaseError> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DatabaseError::ConnectionError(
                "Simulated connection failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for FakeAttendanceStore {
    async fn update_face_result(
        &self,
        attendance_id: i64,
        result: FaceResult,
    ) -> Result<AttendanceRecord, DatabaseError> {
        self.check_write()?;
        let mut tables = self.tables.write().unwrap();
        let record = tables
            .attendance
            .get_mut(&attendance_id)
            .ok_or(DatabaseError::AttendanceNotFound(attendance_id))?;

        let desired = result.apply_to(&record.face_fields());
        record.set_face_fields(desired);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    async fn register_reference_image(
        &self,
        subject_id: i64,
        attendance_id: i64,
        image_ref: &str,
    ) -> Result<AttendanceRecord, DatabaseError> {
        self.check_write()?;
        let mut tables = self.tables.write().unwrap();
        if !tables.subjects.contains_key(&subject_id) {
            return Err(DatabaseError::SubjectNotFound(subject_id));
        }
        if !tables.attendance.contains_key(&attendance_id) {
            return Err(DatabaseError::AttendanceNotFound(attendance_id));
        }

        if let Some(subject) = tables.subjects.get_mut(&subject_id) {
            subject.has_reference_image = true;
        }
        let record = tables
            .attendance
            .get_mut(&attendance_id)
            .ok_or(DatabaseError::AttendanceNotFound(attendance_id))?;
        let desired = FaceResult::verified(image_ref).apply_to(&record.face_fields());
        record.set_face_fields(desired);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    async fn create_attendance(
        &self,
        new: NewAttendance,
    ) -> Result<(AttendanceRecord, bool), DatabaseError> {
        let mut tables = self.tables.write().unwrap();
        if !tables.subjects.contains_key(&new.subject_id) {
            return Err(DatabaseError::SubjectNotFound(new.subject_id));
        }
        if let Some(existing) = tables
            .attendance
            .values()
            .find(|r| r.session_id == new.session_id && r.subject_id == new.subject_id)
        {
            return Ok((existing.clone(), false));
        }

        self.check_write()?;
        tables.next_id += 1;
        let (status, is_present) = new.initial_state();
        let record = AttendanceRecord {
            id: tables.next_id,
            session_id: new.session_id,
            subject_id: new.subject_id,
            face_recognition_status: status,
            is_present,
            face_image_ref: None,
            location: new.location,
            created_at: Utc::now(),
        };
        tables.attendance.insert(record.id, record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok((record, true))
    }

    async fn get_attendance(&self, attendance_id: i64) -> Result<AttendanceRecord, DatabaseError> {
        self.tables
            .read()
            .unwrap()
            .attendance
            .get(&attendance_id)
            .cloned()
            .ok_or(DatabaseError::AttendanceNotFound(attendance_id))
    }

    async fn get_subject(&self, subject_id: i64) -> Result<Subject, DatabaseError> {
        self.tables
            .read()
            .unwrap()
            .subjects
            .get(&subject_id)
            .cloned()
            .ok_or(DatabaseError::SubjectNotFound(subject_id))
    }

    #[cfg(test)]
    async fn add_subject(&self, subject: Subject) -> Result<(), DatabaseError> {
        self.fake_add_subject(subject);
        Ok(())
    }
}
