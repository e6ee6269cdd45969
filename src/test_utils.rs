use crate::config::{load_config, Config};
use crate::db::{AttendanceRecord, FaceRecognitionStatus};
use chrono::Utc;

/// Check if a test is enabled via environment variable
fn is_test_enabled(env_var: &str) -> bool {
    std::env::var(env_var)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Check if PostgreSQL tests are enabled via environment variable
pub fn is_db_enabled() -> bool {
    is_test_enabled("ENABLE_DB_TESTS")
}

/// Check if S3 tests are enabled via environment variable
pub fn is_s3_enabled() -> bool {
    is_test_enabled("ENABLE_S3_TESTS")
}

/// Load test configuration from config.toml
pub fn load_test_config() -> Result<Config, anyhow::Error> {
    load_config("config.toml").map_err(|e| anyhow::anyhow!("Failed to load config.toml: {}", e))
}

/// Creates an attendance record awaiting face verification
pub fn pending_attendance(id: i64, session_id: i64, subject_id: i64) -> AttendanceRecord {
    AttendanceRecord {
        id,
        session_id,
        subject_id,
        face_recognition_status: FaceRecognitionStatus::Pending,
        is_present: false,
        face_image_ref: None,
        location: None,
        created_at: Utc::now(),
    }
}

/// Builds an S3 object-created notification body for the given keys
pub fn upload_notification(bucket: &str, keys: &[&str]) -> String {
    let records: Vec<serde_json::Value> = keys
        .iter()
        .map(|key| {
            serde_json::json!({
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": key, "size": 1024 }
                }
            })
        })
        .collect();

    serde_json::json!({ "Records": records }).to_string()
}

/// Body of the connectivity test event S3 sends when a notification is configured
pub fn test_event_notification(bucket: &str) -> String {
    serde_json::json!({
        "Service": "Amazon S3",
        "Event": "s3:TestEvent",
        "Time": "2024-01-01T00:00:00.000Z",
        "Bucket": bucket,
        "RequestId": "5582815E1AEA5ADF",
        "HostId": "8cLeGAmw098X5cv4Zkwcmo8vvZa3eH3eKxsPzbB9wrR+YstdA6Knx4Ip8EXAMPLE"
    })
    .to_string()
}
