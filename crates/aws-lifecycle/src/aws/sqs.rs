//! SQS queue and message management

use super::context::{AwsContext, FromAwsContext};
use super::error::classify_anyhow_error;
use super::operations::SqsOperations;
use super::types::{QueueConfig, ReceivedMessage};
use anyhow::{Context, Result};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::QueueAttributeName;
use tracing::{debug, info};

/// Request every message attribute on receive
const ALL_MESSAGE_ATTRIBUTES: &str = "All";

/// SQS client bound to one region
pub struct SqsClient {
    client: Client,
}

impl FromAwsContext for SqsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.sqs_client(),
        }
    }
}

impl SqsClient {
    /// Create a new SQS client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }
}

impl SqsOperations for SqsClient {
    async fn create_queue(&self, config: &QueueConfig) -> Result<String> {
        info!(
            queue = %config.name,
            fifo = config.fifo,
            content_based_deduplication = config.content_based_deduplication,
            "Creating SQS queue"
        );

        let mut request = self.client.create_queue().queue_name(&config.name);

        if config.fifo {
            request = request.attributes(QueueAttributeName::FifoQueue, "true");
        }
        if config.content_based_deduplication {
            request = request.attributes(QueueAttributeName::ContentBasedDeduplication, "true");
        }

        let response = request.send().await.context("Failed to create queue")?;

        let queue_url = response
            .queue_url()
            .context("No queue URL returned")?
            .to_string();

        info!(queue_url = %queue_url, "Queue created");
        Ok(queue_url)
    }

    async fn queue_exists(&self, queue_url: &str) -> Result<bool> {
        let result = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = anyhow::Error::from(e);
                if classify_anyhow_error(&err).is_not_found() {
                    debug!(queue_url = %queue_url, "Queue not visible yet");
                    Ok(false)
                } else {
                    Err(err.context("Failed to check queue"))
                }
            }
        }
    }

    async fn list_queues(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        let mut next_token = None;

        loop {
            let response = self
                .client
                .list_queues()
                .set_next_token(next_token.take())
                .send()
                .await
                .context("Failed to list queues")?;

            // An account without queues gets no QueueUrls key at all; the SDK
            // surfaces that as an empty slice.
            urls.extend(response.queue_urls().iter().cloned());

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(count = urls.len(), "Listed queues");
        Ok(urls)
    }

    async fn send_message(&self, queue_url: &str, body: &str, group_id: &str) -> Result<String> {
        info!(queue_url = %queue_url, group_id = %group_id, "Sending message");

        let response = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .message_group_id(group_id)
            .send()
            .await
            .context("Failed to send message")?;

        Ok(response.message_id().unwrap_or_default().to_string())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        let response = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages)
            .message_attribute_names(ALL_MESSAGE_ATTRIBUTES)
            .send()
            .await
            .context("Failed to receive messages")?;

        let messages: Vec<ReceivedMessage> = response
            .messages()
            .iter()
            .filter_map(|m| {
                Some(ReceivedMessage {
                    message_id: m.message_id().unwrap_or_default().to_string(),
                    body: m.body().unwrap_or_default().to_string(),
                    receipt_handle: m.receipt_handle()?.to_string(),
                })
            })
            .collect();

        debug!(queue_url = %queue_url, count = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        info!(queue_url = %queue_url, "Deleting message");

        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .context("Failed to delete message")?;

        Ok(())
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<()> {
        info!(queue_url = %queue_url, "Deleting queue");

        self.client
            .delete_queue()
            .queue_url(queue_url)
            .send()
            .await
            .context("Failed to delete queue")?;

        Ok(())
    }
}
