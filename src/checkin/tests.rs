use crate::checkin::{initial_face_state, upload_key, CheckInDesk, CheckInError, CheckInRequest};
use crate::db::{AttendanceStore, FaceRecognitionStatus, FaceResult, FakeAttendanceStore, Subject};
use crate::key::{ImageRole, ObjectKey};
use crate::s3::FakeStorage;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

fn desk() -> (
    CheckInDesk<FakeStorage, FakeAttendanceStore>,
    Arc<FakeStorage>,
    Arc<FakeAttendanceStore>,
) {
    let storage = Arc::new(FakeStorage::new());
    let store = Arc::new(FakeAttendanceStore::new());
    store.fake_add_subject(Subject::new(42));
    (
        CheckInDesk::new(storage.clone(), store.clone(), Duration::from_secs(300)),
        storage,
        store,
    )
}

fn request(requires_verification: bool) -> CheckInRequest {
    CheckInRequest {
        session_id: 1,
        subject_id: 42,
        requires_verification,
        location: None,
    }
}

#[test]
fn initial_state_follows_session_policy() {
    assert_eq!(initial_face_state(true), (FaceRecognitionStatus::Pending, false));
    assert_eq!(initial_face_state(false), (FaceRecognitionStatus::NotRequired, true));
}

#[test]
fn upload_key_depends_on_reference_image() {
    let issued_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let mut subject = Subject::new(42);

    let key = upload_key(&subject, 7, issued_at);
    assert_eq!(key.to_string(), "42/7_reference.jpeg");

    subject.has_reference_image = true;
    let key = upload_key(&subject, 7, issued_at);
    assert_eq!(key.to_string(), "42/7_1700000000.jpeg");
    assert_eq!(
        ObjectKey::parse(&key.to_string()).unwrap().role,
        ImageRole::Candidate {
            timestamp: 1_700_000_000
        }
    );
}

#[tokio::test]
async fn first_check_in_gets_reference_upload_target() {
    let (desk, _, _) = desk();
    let receipt = desk.check_in(request(true), Utc::now()).await.unwrap();

    assert_eq!(
        receipt.attendance.face_recognition_status,
        FaceRecognitionStatus::Pending
    );
    let upload = receipt.upload.unwrap();
    assert_eq!(
        upload.object_key,
        format!("42/{}_reference.jpeg", receipt.attendance.id)
    );
    assert!(upload.url.contains(&upload.object_key));
    assert_eq!(upload.expires_in, Duration::from_secs(300));
}

#[tokio::test]
async fn subject_with_reference_gets_candidate_target() {
    let (desk, _, store) = desk();
    store
        .add_subject(Subject {
            id: 42,
            has_reference_image: true,
        })
        .await
        .unwrap();
    let now = Utc.timestamp_opt(1_700_000_123, 0).unwrap();

    let receipt = desk.check_in(request(true), now).await.unwrap();
    let upload = receipt.upload.unwrap();
    assert_eq!(
        upload.object_key,
        format!("42/{}_1700000123.jpeg", receipt.attendance.id)
    );
}

#[tokio::test]
async fn session_without_verification_needs_no_upload() {
    let (desk, _, _) = desk();
    let receipt = desk.check_in(request(false), Utc::now()).await.unwrap();

    assert!(receipt.attendance.is_present);
    assert!(receipt.upload.is_none());
}

#[tokio::test]
async fn present_subject_is_rejected() {
    let (desk, _, store) = desk();
    let receipt = desk.check_in(request(true), Utc::now()).await.unwrap();
    store
        .update_face_result(receipt.attendance.id, FaceResult::verified("x.jpeg"))
        .await
        .unwrap();

    let err = desk.check_in(request(true), Utc::now()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckInError::AlreadyPresent {
            subject_id: 42,
            session_id: 1
        }
    ));
}

#[tokio::test]
async fn failed_verification_can_upload_again() {
    let (desk, _, store) = desk();
    let first = desk.check_in(request(true), Utc::now()).await.unwrap();
    store
        .update_face_result(first.attendance.id, FaceResult::rejected("x.jpeg"))
        .await
        .unwrap();

    let retry = desk.check_in(request(true), Utc::now()).await.unwrap();
    assert_eq!(retry.attendance.id, first.attendance.id);
    assert!(retry.upload.is_some());
}

#[tokio::test]
async fn presign_failure_is_reported() {
    let (desk, storage, _) = desk();
    storage.fake_fail_next(1);

    let err = desk.check_in(request(true), Utc::now()).await.unwrap_err();
    assert!(matches!(err, CheckInError::Storage(_)));
}

#[tokio::test]
async fn unknown_subject_is_reported() {
    let (desk, _, _) = desk();
    let mut request = request(true);
    request.subject_id = 404;

    let err = desk.check_in(request, Utc::now()).await.unwrap_err();
    assert!(matches!(err, CheckInError::Database(ref e) if e.is_not_found()));
}
