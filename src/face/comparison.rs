use crate::face::error::ComparisonError;
use async_trait::async_trait;
use std::fmt;

/// Location of a photograph in object storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

impl ImageRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Decision of a face comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// At least one face pair matched
    Match,
    /// No matching pair, or the capability could not find a usable face
    NoMatch,
}

impl Comparison {
    pub fn is_match(self) -> bool {
        self == Comparison::Match
    }
}

/// FaceComparison trait wrapping a managed face-similarity capability
#[async_trait]
pub trait FaceComparison: Send + Sync + 'static {
    /// Compare the face in `candidate` against the face in `reference`
    ///
    /// Invalid input (no detectable face, unusable image) is a `NoMatch`,
    /// never an error.
    async fn compare(
        &self,
        reference: &ImageRef,
        candidate: &ImageRef,
    ) -> Result<Comparison, ComparisonError>;
}
