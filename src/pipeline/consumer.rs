use crate::config::Config;
use crate::db::AttendanceStore;
use crate::face::FaceComparison;
use crate::pipeline::envelope::{parse_envelope, Envelope};
use crate::pipeline::router::ImageRouter;
use crate::queue::{Queue, QueueError, QueueMessage};
use crate::s3::Storage;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Polling parameters of the consumer loop
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub batch_size: i32,
    pub wait_time: Duration,
    pub poll_backoff: Duration,
    pub max_poll_backoff: Duration,
    pub message_timeout: Duration,
}

impl ConsumerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.queue.batch_size(),
            wait_time: config.queue.wait_time(),
            poll_backoff: config.queue.poll_backoff(),
            max_poll_backoff: config.queue.max_poll_backoff(),
            message_timeout: config.pipeline.message_timeout(),
        }
    }
}

/// What to do with a message once it has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Every record reached a terminal outcome; delete the message
    Acknowledge,
    /// A retryable failure occurred; leave the message for redelivery
    Retain,
}

/// Summary of one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub acknowledged: usize,
    pub retained: usize,
    pub delete_failures: usize,
}

/// Delay before the poll after `current` failed, doubled and capped at `max`
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

/// Long-polls the queue and routes every upload it announces
pub struct Consumer<Q: ?Sized, S: ?Sized, F: ?Sized, D: ?Sized> {
    queue: Arc<Q>,
    router: ImageRouter<S, F, D>,
    settings: ConsumerSettings,
}

impl<Q, S, F, D> Consumer<Q, S, F, D>
where
    Q: Queue + ?Sized,
    S: Storage + ?Sized,
    F: FaceComparison + ?Sized,
    D: AttendanceStore + ?Sized,
{
    pub fn new(queue: Arc<Q>, router: ImageRouter<S, F, D>, settings: ConsumerSettings) -> Self {
        Self {
            queue,
            router,
            settings,
        }
    }

    /// Run until `shutdown` resolves
    ///
    /// Shutdown is only observed while waiting on the queue, so a received
    /// batch is always handled to completion and nothing is acknowledged
    /// without having been processed.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut backoff = self.settings.poll_backoff;
        info!(
            "Consumer started: batch size {}, wait {:?}",
            self.settings.batch_size, self.settings.wait_time
        );

        loop {
            let received = tokio::select! {
                _ = &mut shutdown => break,
                received = self.receive() => received,
            };

            match received {
                Ok(messages) => {
                    backoff = self.settings.poll_backoff;
                    if messages.is_empty() {
                        debug!("No messages received");
                        continue;
                    }
                    let report = self.process_batch(messages).await;
                    info!(
                        "Processed batch: {} received, {} acknowledged, {} retained, {} delete failures",
                        report.received, report.acknowledged, report.retained, report.delete_failures
                    );
                }
                Err(e) => {
                    error!("Failed to poll queue: {}; retrying in {:?}", e, backoff);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = sleep(backoff) => {}
                    }
                    backoff = next_backoff(backoff, self.settings.max_poll_backoff);
                }
            }
        }

        info!("Shutdown requested, consumer stopped");
    }

    /// Receive one batch and handle every message in it
    pub async fn poll_once(&self) -> Result<BatchReport, QueueError> {
        let messages = self.receive().await?;
        Ok(self.process_batch(messages).await)
    }

    async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
        self.queue
            .receive(self.settings.batch_size, self.settings.wait_time)
            .await
    }

    async fn process_batch(&self, messages: Vec<QueueMessage>) -> BatchReport {
        let mut report = BatchReport {
            received: messages.len(),
            ..BatchReport::default()
        };

        // Sequential, so two uploads for one attendance id never race in this process
        for message in &messages {
            let disposition =
                match timeout(self.settings.message_timeout, self.handle_message(message)).await {
                    Ok(disposition) => disposition,
                    Err(_) => {
                        error!(
                            "Message {} not handled within {:?}; leaving it for redelivery",
                            message.message_id, self.settings.message_timeout
                        );
                        Disposition::Retain
                    }
                };

            match disposition {
                Disposition::Acknowledge => match self.queue.delete(&message.receipt_handle).await {
                    Ok(()) => report.acknowledged += 1,
                    Err(e) => {
                        warn!(
                            "Failed to delete message {}: {}; it will be redelivered",
                            message.message_id, e
                        );
                        report.delete_failures += 1;
                    }
                },
                Disposition::Retain => report.retained += 1,
            }
        }

        report
    }

    /// Handle every record of one message and decide its disposition
    pub async fn handle_message(&self, message: &QueueMessage) -> Disposition {
        let uploads = match parse_envelope(&message.body) {
            Ok(Envelope::TestEvent) => {
                info!("Skipping storage test event in message {}", message.message_id);
                return Disposition::Acknowledge;
            }
            Ok(Envelope::Uploads(uploads)) => uploads,
            Err(e) => {
                warn!("Dropping malformed message {}: {}", message.message_id, e);
                return Disposition::Acknowledge;
            }
        };

        let mut disposition = Disposition::Acknowledge;
        for upload in &uploads {
            match self.router.route(upload).await {
                Ok(outcome) => debug!("Message {}: {} {}", message.message_id, upload, outcome),
                Err(e) if e.is_retryable() => {
                    error!(
                        "Message {}: retryable failure for {}: {}",
                        message.message_id, upload, e
                    );
                    disposition = Disposition::Retain;
                }
                Err(e) => {
                    error!(
                        "Message {}: dropping {} after permanent failure: {}",
                        message.message_id, upload, e
                    );
                }
            }
        }
        disposition
    }
}
