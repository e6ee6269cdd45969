use crate::s3::error::StorageError;
use async_trait::async_trait;
#[cfg(test)]
use bytes::Bytes;
use std::time::Duration;

/// Storage trait defining the object operations the pipeline and the upload issuer need
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Copy an object within a bucket, overwriting the destination
    ///
    /// * `bucket` - Bucket holding both objects
    /// * `source_key` - Key of the object to copy
    /// * `destination_key` - Key to write the copy to
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StorageError>;

    /// Presign a PUT of a JPEG photograph to `key` in the upload bucket
    ///
    /// * `key` - Destination object key
    /// * `expires_in` - How long the returned URL stays valid
    async fn presign_upload(&self, key: &str, expires_in: Duration)
        -> Result<String, StorageError>;

    /// Put an object (test-only)
    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StorageError>;

    /// Get an object (test-only)
    #[cfg(test)]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;
}
