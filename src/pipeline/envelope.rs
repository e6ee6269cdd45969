use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const TEST_EVENT: &str = "s3:TestEvent";
const OBJECT_CREATED_PREFIX: &str = "ObjectCreated:";

/// Errors produced when a message body is not a storage notification
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Message body is not valid notification JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Notification carries neither records nor a test event")]
    MissingRecords,
}

/// One uploaded object named by a notification record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub bucket: String,
    /// Raw (URL-decoded) object key
    pub object_key: String,
}

impl fmt::Display for UploadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.object_key)
    }
}

/// Decoded queue message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Connectivity test sent when a bucket notification is configured
    TestEvent,
    /// Object-created records, in notification order
    Uploads(Vec<UploadEvent>),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Notification {
    records: Option<Vec<NotificationRecord>>,
    event: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRecord {
    event_name: Option<String>,
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Decode a storage notification message body
pub fn parse_envelope(body: &str) -> Result<Envelope, EnvelopeError> {
    let notification: Notification = serde_json::from_str(body)?;

    if notification.event.as_deref() == Some(TEST_EVENT) {
        return Ok(Envelope::TestEvent);
    }

    let records = notification.records.ok_or(EnvelopeError::MissingRecords)?;
    let uploads = records
        .into_iter()
        .filter(|record| match record.event_name.as_deref() {
            Some(name) if !name.starts_with(OBJECT_CREATED_PREFIX) => {
                debug!("Ignoring {} event for {}", name, record.s3.object.key);
                false
            }
            _ => true,
        })
        .map(|record| UploadEvent {
            object_key: decode_object_key(&record.s3.object.key),
            bucket: record.s3.bucket.name,
        })
        .collect();

    Ok(Envelope::Uploads(uploads))
}

/// Restore the raw object key from its notification form
///
/// Notifications URL-encode keys with `+` for spaces. A key that does not
/// decode is passed through unchanged and fails the key layout downstream.
pub fn decode_object_key(encoded: &str) -> String {
    let spaced = encoded.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("Object key {:?} is not valid URL encoding: {}", encoded, e);
            encoded.to_string()
        }
    }
}
