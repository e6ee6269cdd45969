use crate::queue::error::QueueError;
use crate::queue::queue::{Queue, QueueMessage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

struct FakeEntry {
    message_id: String,
    body: String,
    /// Receipt handle of the current delivery; `Some` while in flight
    receipt_handle: Option<String>,
    receive_count: u32,
}

#[derive(Default)]
struct FakeQueueState {
    entries: Vec<FakeEntry>,
    deleted: Vec<String>,
    failing_receives: usize,
    failing_deletes: usize,
}

/// `FakeQueue` is an in-memory Queue with visibility-timeout semantics.
///
/// Received messages stay in flight until deleted or until the test calls
/// `fake_expire_visibility`, which makes them receivable again under a new
/// receipt handle.
#[derive(Clone, Default)]
pub struct FakeQueue {
    state: Arc<Mutex<FakeQueueState>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message and return its id
    pub async fn fake_send(&self, body: impl Into<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.state.lock().await.entries.push(FakeEntry {
            message_id: message_id.clone(),
            body: body.into(),
            receipt_handle: None,
            receive_count: 0,
        });
        message_id
    }

    /// Simulate the visibility timeout elapsing for every in-flight message
    pub async fn fake_expire_visibility(&self) {
        for entry in self.state.lock().await.entries.iter_mut() {
            entry.receipt_handle = None;
        }
    }

    pub async fn fake_fail_receives(&self, count: usize) {
        self.state.lock().await.failing_receives = count;
    }

    pub async fn fake_fail_deletes(&self, count: usize) {
        self.state.lock().await.failing_deletes = count;
    }

    /// Messages not yet deleted, visible or in flight
    pub async fn fake_len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn fake_in_flight(&self) -> usize {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|entry| entry.receipt_handle.is_some())
            .count()
    }

    /// Ids of deleted messages, in deletion order
    pub async fn fake_deleted(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    pub async fn fake_receive_count(&self, message_id: &str) -> Option<u32> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .find(|entry| entry.message_id == message_id)
            .map(|entry| entry.receive_count)
    }
}

#[async_trait]
impl Queue for FakeQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let messages = {
            let mut state = self.state.lock().await;
            if state.failing_receives > 0 {
                state.failing_receives -= 1;
                return Err(QueueError::ReceiveError(
                    "Simulated receive failure".to_string(),
                ));
            }

            state
                .entries
                .iter_mut()
                .filter(|entry| entry.receipt_handle.is_none())
                .take(max_messages.max(1) as usize)
                .map(|entry| {
                    let receipt_handle = Uuid::new_v4().to_string();
                    entry.receipt_handle = Some(receipt_handle.clone());
                    entry.receive_count += 1;
                    QueueMessage {
                        message_id: entry.message_id.clone(),
                        receipt_handle,
                        body: entry.body.clone(),
                    }
                })
                .collect::<Vec<_>>()
        };

        if messages.is_empty() {
            // Long poll: an empty queue answers only after the wait elapses
            tokio::time::sleep(wait).await;
        }
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return Err(QueueError::DeleteError(
                "Simulated delete failure".to_string(),
            ));
        }

        let position = state
            .entries
            .iter()
            .position(|entry| entry.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| QueueError::InvalidReceipt(receipt_handle.to_string()))?;

        let entry = state.entries.remove(position);
        state.deleted.push(entry.message_id);
        Ok(())
    }
}
