use crate::s3::error::StorageError;
use crate::s3::fake::FakeStorage;
use crate::s3::s3::S3Storage;
use crate::s3::storage::Storage;
use crate::test_utils::{is_s3_enabled, load_test_config};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

const BUCKET: &str = "attendance-test";

type StorageFactory =
    Box<dyn Fn() -> futures::future::BoxFuture<'static, (String, Arc<dyn Storage + Send + Sync>)>>;

// Create test storages using lazy factory pattern
fn get_test_storages() -> Vec<(&'static str, StorageFactory)> {
    let mut storages: Vec<(&'static str, StorageFactory)> = vec![(
        "fake",
        Box::new(|| {
            Box::pin(async {
                (
                    BUCKET.to_string(),
                    Arc::new(FakeStorage::new()) as Arc<dyn Storage + Send + Sync>,
                )
            })
        }),
    )];

    if is_s3_enabled() {
        let config = load_test_config().expect("Failed to load test config");

        storages.push((
            "s3",
            Box::new(move || {
                let config = config.clone();
                Box::pin(async move {
                    let sdk_config = crate::aws::load_sdk_config(&config.aws).await;
                    let storage = S3Storage::new(&sdk_config, &config.s3);
                    (
                        config.s3.bucket.clone(),
                        Arc::new(storage) as Arc<dyn Storage + Send + Sync>,
                    )
                })
            }),
        ));
    }

    storages
}

#[tokio::test]
async fn copy_object_writes_destination() {
    for (name, storage_factory) in get_test_storages() {
        let (bucket, storage) = storage_factory().await;
        let data = Bytes::from("jpeg bytes");

        storage
            .add_object(&bucket, "42/7_reference.jpeg", data.clone())
            .await
            .unwrap();

        storage
            .copy_object(&bucket, "42/7_reference.jpeg", "42/reference.jpeg")
            .await
            .unwrap_or_else(|e| panic!("copy failed with {}: {}", name, e));

        let copied = storage.get_object(&bucket, "42/reference.jpeg").await.unwrap();
        assert_eq!(copied, data, "copy mismatch with {}", name);
    }
}

#[tokio::test]
async fn copy_object_is_idempotent_and_overwrites() {
    for (name, storage_factory) in get_test_storages() {
        let (bucket, storage) = storage_factory().await;

        storage
            .add_object(&bucket, "42/7_reference.jpeg", Bytes::from("first"))
            .await
            .unwrap();
        storage
            .copy_object(&bucket, "42/7_reference.jpeg", "42/reference.jpeg")
            .await
            .unwrap();
        storage
            .copy_object(&bucket, "42/7_reference.jpeg", "42/reference.jpeg")
            .await
            .unwrap();

        storage
            .add_object(&bucket, "42/8_reference.jpeg", Bytes::from("second"))
            .await
            .unwrap();
        storage
            .copy_object(&bucket, "42/8_reference.jpeg", "42/reference.jpeg")
            .await
            .unwrap();

        let copied = storage.get_object(&bucket, "42/reference.jpeg").await.unwrap();
        assert_eq!(copied, Bytes::from("second"), "overwrite failed with {}", name);
    }
}

#[tokio::test]
async fn copy_of_missing_source_returns_not_found() {
    for (name, storage_factory) in get_test_storages() {
        let (bucket, storage) = storage_factory().await;
        let result = storage
            .copy_object(&bucket, "missing/1_reference.jpeg", "missing/reference.jpeg")
            .await;

        assert!(
            matches!(result, Err(StorageError::ObjectNotFound(_))),
            "Expected ObjectNotFound with {}, got: {:?}",
            name,
            result
        );
    }
}

#[tokio::test]
async fn presign_upload_returns_url_for_key() {
    for (name, storage_factory) in get_test_storages() {
        let (_, storage) = storage_factory().await;
        let url = storage
            .presign_upload("42/7_reference.jpeg", Duration::from_secs(300))
            .await
            .unwrap_or_else(|e| panic!("presign failed with {}: {}", name, e));

        assert!(url.contains("42/7_reference.jpeg"), "url {} with {}", url, name);
    }
}

#[tokio::test]
async fn fake_failures_are_scoped_and_recoverable() {
    let storage = FakeStorage::new();
    storage
        .add_object(BUCKET, "1/2_reference.jpeg", Bytes::from("data"))
        .await
        .unwrap();

    storage.fake_fail_next(1);
    assert!(matches!(
        storage
            .copy_object(BUCKET, "1/2_reference.jpeg", "1/reference.jpeg")
            .await,
        Err(StorageError::ConnectionError(_))
    ));
    assert!(!storage.fake_has_object(BUCKET, "1/reference.jpeg").await);

    storage.fake_fail_key("1/reference.jpeg").await;
    assert!(storage
        .copy_object(BUCKET, "1/2_reference.jpeg", "1/reference.jpeg")
        .await
        .is_err());

    storage.fake_reset_key("1/reference.jpeg").await;
    storage
        .copy_object(BUCKET, "1/2_reference.jpeg", "1/reference.jpeg")
        .await
        .unwrap();
    assert!(storage.fake_has_object(BUCKET, "1/reference.jpeg").await);
    assert_eq!(storage.fake_copy_count(), 1);
}
