use crate::config::QueueConfig;
use crate::queue::error::QueueError;
use crate::queue::queue::{Queue, QueueMessage};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Amazon SQS implementation of the Queue trait
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    visibility_timeout: Option<i32>,
}

impl SqsQueue {
    /// Create a queue client, resolving the queue URL from its name when no URL is configured
    pub async fn new(sdk_config: &SdkConfig, config: &QueueConfig) -> Result<Self, QueueError> {
        let mut builder = aws_sdk_sqs::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.endpoint {
            info!("Using custom SQS endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        let queue_url = match (&config.queue_url, &config.queue_name) {
            (Some(url), _) => url.clone(),
            (None, Some(name)) => Self::resolve_queue_url(&client, name).await?,
            (None, None) => {
                return Err(QueueError::Configuration(
                    "either queue_url or queue_name is required".to_string(),
                ))
            }
        };

        info!("Consuming from queue {}", queue_url);

        Ok(Self {
            client,
            queue_url,
            visibility_timeout: config.visibility_timeout_seconds,
        })
    }

    async fn resolve_queue_url(client: &Client, name: &str) -> Result<String, QueueError> {
        let output = client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| QueueError::ResolveError(name.to_string(), e.to_string()))?;

        output.queue_url.ok_or_else(|| {
            QueueError::ResolveError(name.to_string(), "response carried no URL".to_string())
        })
    }
}

#[async_trait]
impl Queue for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut request = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait.as_secs() as i32);

        if let Some(visibility_timeout) = self.visibility_timeout {
            request = request.visibility_timeout(visibility_timeout);
        }

        let output = request
            .send()
            .await
            .map_err(|e| QueueError::ReceiveError(e.to_string()))?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let message_id = message.message_id.unwrap_or_default();
                match message.receipt_handle {
                    Some(receipt_handle) => Some(QueueMessage {
                        message_id,
                        receipt_handle,
                        body: message.body.unwrap_or_default(),
                    }),
                    None => {
                        warn!("Skipping message {} without receipt handle", message_id);
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        debug!("Received {} message(s)", messages.len());
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|err| err.is_receipt_handle_is_invalid())
                {
                    QueueError::InvalidReceipt(receipt_handle.to_string())
                } else {
                    QueueError::DeleteError(e.to_string())
                }
            })?;
        Ok(())
    }
}
