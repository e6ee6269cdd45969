use crate::db::error::DatabaseError;
use crate::face::Comparison;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Face-verification state of an attendance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceRecognitionStatus {
    /// The session does not require a photograph
    NotRequired,
    /// Waiting for the pipeline to process an upload
    Pending,
    Success,
    Failed,
}

impl FaceRecognitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceRecognitionStatus::NotRequired => "NOT_REQUIRED",
            FaceRecognitionStatus::Pending => "PENDING",
            FaceRecognitionStatus::Success => "SUCCESS",
            FaceRecognitionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for FaceRecognitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaceRecognitionStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_REQUIRED" => Ok(FaceRecognitionStatus::NotRequired),
            "PENDING" => Ok(FaceRecognitionStatus::Pending),
            "SUCCESS" => Ok(FaceRecognitionStatus::Success),
            "FAILED" => Ok(FaceRecognitionStatus::Failed),
            other => Err(DatabaseError::DeserializationError(format!(
                "Invalid face recognition status: {}",
                other
            ))),
        }
    }
}

/// Coordinates captured at check-in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

/// One check-in attempt of a subject for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub session_id: i64,
    pub subject_id: i64,
    pub face_recognition_status: FaceRecognitionStatus,
    pub is_present: bool,
    pub face_image_ref: Option<String>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub has_reference_image: bool,
}

impl Subject {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            has_reference_image: false,
        }
    }
}

/// Request to open an attendance record for a subject in a session
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub session_id: i64,
    pub subject_id: i64,
    pub requires_verification: bool,
    pub location: Option<Location>,
}

/// Initial `(status, is_present)` of a freshly created record
pub fn initial_face_state(requires_verification: bool) -> (FaceRecognitionStatus, bool) {
    if requires_verification {
        (FaceRecognitionStatus::Pending, false)
    } else {
        (FaceRecognitionStatus::NotRequired, true)
    }
}

impl NewAttendance {
    pub fn initial_state(&self) -> (FaceRecognitionStatus, bool) {
        initial_face_state(self.requires_verification)
    }
}

/// Outcome of the pipeline for one attendance record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceResult {
    pub status: FaceRecognitionStatus,
    pub is_present: bool,
    pub image_ref: Option<String>,
}

/// Fields of a record written by a face result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceFields {
    pub status: FaceRecognitionStatus,
    pub is_present: bool,
    pub image_ref: Option<String>,
}

impl FaceResult {
    pub fn verified(image_ref: impl Into<String>) -> Self {
        Self {
            status: FaceRecognitionStatus::Success,
            is_present: true,
            image_ref: Some(image_ref.into()),
        }
    }

    pub fn rejected(image_ref: impl Into<String>) -> Self {
        Self {
            status: FaceRecognitionStatus::Failed,
            is_present: false,
            image_ref: Some(image_ref.into()),
        }
    }

    pub fn from_comparison(comparison: Comparison, image_ref: impl Into<String>) -> Self {
        match comparison {
            Comparison::Match => Self::verified(image_ref),
            Comparison::NoMatch => Self::rejected(image_ref),
        }
    }

    /// End state of a record currently in `current` once this result is applied
    ///
    /// Status, presence and image reference are overwritten, so applying the
    /// same result twice is a no-op. A record that already counts as present
    /// is never downgraded by a result that is not present.
    pub fn apply_to(&self, current: &FaceFields) -> FaceFields {
        if current.is_present && !self.is_present {
            return current.clone();
        }
        FaceFields {
            status: self.status,
            is_present: self.is_present,
            image_ref: self.image_ref.clone().or_else(|| current.image_ref.clone()),
        }
    }
}

impl AttendanceRecord {
    pub fn face_fields(&self) -> FaceFields {
        FaceFields {
            status: self.face_recognition_status,
            is_present: self.is_present,
            image_ref: self.face_image_ref.clone(),
        }
    }

    pub fn set_face_fields(&mut self, fields: FaceFields) {
        self.face_recognition_status = fields.status;
        self.is_present = fields.is_present;
        self.face_image_ref = fields.image_ref;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(status: FaceRecognitionStatus, is_present: bool, image: Option<&str>) -> FaceFields {
        FaceFields {
            status,
            is_present,
            image_ref: image.map(str::to_string),
        }
    }

    #[test]
    fn status_round_trips_through_its_column_value() {
        for status in [
            FaceRecognitionStatus::NotRequired,
            FaceRecognitionStatus::Pending,
            FaceRecognitionStatus::Success,
            FaceRecognitionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<FaceRecognitionStatus>().unwrap(), status);
        }
        assert!("present".parse::<FaceRecognitionStatus>().is_err());
    }

    #[test]
    fn match_overwrites_pending_record() {
        let current = fields(FaceRecognitionStatus::Pending, false, None);
        let desired = FaceResult::verified("42/7_1.jpeg").apply_to(&current);
        assert_eq!(
            desired,
            fields(FaceRecognitionStatus::Success, true, Some("42/7_1.jpeg"))
        );
    }

    #[test]
    fn no_match_after_failure_replaces_image() {
        let current = fields(FaceRecognitionStatus::Failed, false, Some("42/7_1.jpeg"));
        let desired = FaceResult::rejected("42/7_2.jpeg").apply_to(&current);
        assert_eq!(
            desired,
            fields(FaceRecognitionStatus::Failed, false, Some("42/7_2.jpeg"))
        );
    }

    #[test]
    fn no_match_never_downgrades_present_record() {
        let current = fields(FaceRecognitionStatus::Success, true, Some("42/7_1.jpeg"));
        let desired = FaceResult::rejected("42/7_2.jpeg").apply_to(&current);
        assert_eq!(desired, current);
    }

    #[test]
    fn applying_a_result_twice_is_a_no_op() {
        let result = FaceResult::from_comparison(Comparison::Match, "42/7_1.jpeg");
        let once = result.apply_to(&fields(FaceRecognitionStatus::Pending, false, None));
        assert_eq!(result.apply_to(&once), once);
    }

    #[test]
    fn initial_state_depends_on_verification() {
        let mut new = NewAttendance {
            session_id: 1,
            subject_id: 42,
            requires_verification: true,
            location: None,
        };
        assert_eq!(new.initial_state(), (FaceRecognitionStatus::Pending, false));
        new.requires_verification = false;
        assert_eq!(new.initial_state(), (FaceRecognitionStatus::NotRequired, true));
    }
}
