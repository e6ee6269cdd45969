use crate::queue::{FakeQueue, Queue, QueueError};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn receive_hides_messages_until_visibility_expires() {
    let queue = FakeQueue::new();
    let id = queue.fake_send("body").await;

    let first = queue.receive(10, Duration::from_secs(20)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].message_id, id);

    let hidden = queue.receive(10, Duration::from_secs(20)).await.unwrap();
    assert!(hidden.is_empty());

    queue.fake_expire_visibility().await;
    let second = queue.receive(10, Duration::from_secs(20)).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_ne!(second[0].receipt_handle, first[0].receipt_handle);
    assert_eq!(queue.fake_receive_count(&id).await, Some(2));
}

#[tokio::test(start_paused = true)]
async fn receive_respects_batch_size() {
    let queue = FakeQueue::new();
    for i in 0..15 {
        queue.fake_send(format!("body {}", i)).await;
    }

    let batch = queue.receive(10, Duration::from_secs(20)).await.unwrap();
    assert_eq!(batch.len(), 10);
    assert_eq!(queue.fake_in_flight().await, 10);
}

#[tokio::test(start_paused = true)]
async fn delete_removes_message_and_stale_handles_are_rejected() {
    let queue = FakeQueue::new();
    let id = queue.fake_send("body").await;

    let first = queue.receive(1, Duration::ZERO).await.unwrap();
    queue.fake_expire_visibility().await;
    let second = queue.receive(1, Duration::ZERO).await.unwrap();

    assert!(matches!(
        queue.delete(&first[0].receipt_handle).await,
        Err(QueueError::InvalidReceipt(_))
    ));

    queue.delete(&second[0].receipt_handle).await.unwrap();
    assert_eq!(queue.fake_len().await, 0);
    assert_eq!(queue.fake_deleted().await, vec![id]);
}

#[tokio::test(start_paused = true)]
async fn simulated_failures_are_consumed() {
    let queue = FakeQueue::new();
    queue.fake_send("body").await;
    queue.fake_fail_receives(1).await;

    assert!(queue.receive(10, Duration::ZERO).await.is_err());
    let batch = queue.receive(10, Duration::ZERO).await.unwrap();

    queue.fake_fail_deletes(1).await;
    assert!(queue.delete(&batch[0].receipt_handle).await.is_err());
    queue.delete(&batch[0].receipt_handle).await.unwrap();
}
