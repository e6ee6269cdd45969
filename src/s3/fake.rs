use crate::s3::error::StorageError;
use crate::s3::storage::Storage;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// `FakeStorage` is an in-memory implementation of the `Storage` trait for testing purposes.
/// It allows simulating various storage scenarios, including successful operations and failures.
#[derive(Clone, Default)]
pub struct FakeStorage {
    data: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_keys: Arc<Mutex<HashSet<String>>>,
    failing_calls: Arc<AtomicUsize>,
    copies: Arc<AtomicUsize>,
    delay: Arc<Mutex<Option<Duration>>>,
}

fn object_path(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, key)
}

impl FakeStorage {
    /// Create a new empty FakeStorage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call touching this key fails until `fake_reset_key` is called
    pub async fn fake_fail_key(&self, key: &str) {
        self.fail_keys.lock().await.insert(key.to_string());
    }

    pub async fn fake_reset_key(&self, key: &str) {
        self.fail_keys.lock().await.remove(key);
    }

    /// The next `count` calls fail with a connection error
    pub fn fake_fail_next(&self, count: usize) {
        self.failing_calls.store(count, Ordering::SeqCst);
    }

    /// Delay every call, to exercise caller timeouts
    pub async fn fake_set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Number of successful copies performed
    pub fn fake_copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub async fn fake_has_object(&self, bucket: &str, key: &str) -> bool {
        self.data.lock().await.contains_key(&object_path(bucket, key))
    }

    async fn check_failure(&self, key: &str) -> Result<(), StorageError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.failing_calls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_calls.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::ConnectionError(
                "Simulated storage outage".to_string(),
            ));
        }

        if self.fail_keys.lock().await.contains(key) {
            return Err(StorageError::ConnectionError(format!(
                "Simulated failure for object: {}",
                key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StorageError> {
        self.check_failure(source_key).await?;
        self.check_failure(destination_key).await?;

        let mut data = self.data.lock().await;
        let source = data
            .get(&object_path(bucket, source_key))
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(source_key.to_string()))?;
        data.insert(object_path(bucket, destination_key), source);
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.check_failure(key).await?;
        Ok(format!(
            "https://fake-storage.local/{}?X-Amz-Expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.data
            .lock()
            .await
            .insert(object_path(bucket, key), data);
        Ok(())
    }

    #[cfg(test)]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        self.check_failure(key).await?;
        self.data
            .lock()
            .await
            .get(&object_path(bucket, key))
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }
}
