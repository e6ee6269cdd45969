use crate::queue::error::QueueError;
use async_trait::async_trait;
use std::time::Duration;

/// A message received from the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    /// Handle of this delivery; changes on every redelivery
    pub receipt_handle: String,
    pub body: String,
}

/// Queue trait for an at-least-once, unordered message queue
#[async_trait]
pub trait Queue: Send + Sync + 'static {
    /// Long-poll for up to `max_messages` messages, waiting at most `wait`
    ///
    /// Received messages stay hidden from other consumers until their
    /// visibility timeout elapses or they are deleted.
    async fn receive(
        &self,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Delete (acknowledge) a received message by its receipt handle
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}
