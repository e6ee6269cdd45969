use crate::key::error::KeyError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Role marker of a reference ("baseline") photograph
pub const REFERENCE_MARKER: &str = "reference";

/// Extension every uploaded photograph carries
pub const IMAGE_EXTENSION: &str = "jpeg";

// {subject_id}/{attendance_id}_{reference|timestamp}.jpeg
static KEY_LAYOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)/([0-9]+)_(reference|[0-9]+)\.jpeg$").expect("object key layout is a valid regex")
});

/// What an uploaded photograph is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// Baseline photograph of the subject
    Reference,
    /// Check-in photograph taken at the given unix timestamp
    Candidate { timestamp: u64 },
}

/// Structured form of an upload object key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKey {
    pub subject_id: i64,
    pub attendance_id: i64,
    pub role: ImageRole,
}

impl ObjectKey {
    pub fn reference(subject_id: i64, attendance_id: i64) -> Self {
        Self {
            subject_id,
            attendance_id,
            role: ImageRole::Reference,
        }
    }

    pub fn candidate(subject_id: i64, attendance_id: i64, timestamp: u64) -> Self {
        Self {
            subject_id,
            attendance_id,
            role: ImageRole::Candidate { timestamp },
        }
    }

    /// Parse an object key.
    ///
    /// The whole key must match the layout in a single pass; anything else is
    /// rejected and no partial descriptor is ever produced.
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let captures = KEY_LAYOUT
            .captures(key)
            .ok_or_else(|| KeyError::Malformed(key.to_string()))?;

        let subject_id = parse_identifier(key, &captures[1])?;
        let attendance_id = parse_identifier(key, &captures[2])?;
        let role = match &captures[3] {
            REFERENCE_MARKER => ImageRole::Reference,
            timestamp => ImageRole::Candidate {
                timestamp: timestamp
                    .parse()
                    .map_err(|_| KeyError::OutOfRange(key.to_string(), timestamp.to_string()))?,
            },
        };

        Ok(Self {
            subject_id,
            attendance_id,
            role,
        })
    }

    pub fn is_reference(&self) -> bool {
        self.role == ImageRole::Reference
    }

    /// Canonical location of this subject's reference image
    pub fn reference_image_key(&self) -> String {
        reference_image_key(self.subject_id)
    }
}

impl FromStr for ObjectKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            ImageRole::Reference => write!(
                f,
                "{}/{}_{}.{}",
                self.subject_id, self.attendance_id, REFERENCE_MARKER, IMAGE_EXTENSION
            ),
            ImageRole::Candidate { timestamp } => write!(
                f,
                "{}/{}_{}.{}",
                self.subject_id, self.attendance_id, timestamp, IMAGE_EXTENSION
            ),
        }
    }
}

/// Canonical reference image location for a subject.
///
/// Has no attendance id, so it never matches the upload layout: the storage
/// notification emitted by the promotion copy is dropped by the codec.
pub fn reference_image_key(subject_id: i64) -> String {
    format!("{}/{}.{}", subject_id, REFERENCE_MARKER, IMAGE_EXTENSION)
}

fn parse_identifier(key: &str, digits: &str) -> Result<i64, KeyError> {
    digits
        .parse()
        .map_err(|_| KeyError::OutOfRange(key.to_string(), digits.to_string()))
}
