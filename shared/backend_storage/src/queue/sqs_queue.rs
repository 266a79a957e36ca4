//! AWS SQS queue implementation
//!
//! The routing key of a message travels as the `channel` message attribute so
//! consumers can route without inspecting the body.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::types::{MessageAttributeValue, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client as SqsClient;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::queue::{
    error::{QueueError, QueueResult},
    types::{OutgoingMessage, PollOptions, QueueConfig, QueueMessage},
    MessageQueue,
};

/// Message attribute carrying the routing key
pub const CHANNEL_ATTRIBUTE: &str = "channel";

/// SQS rejects batches with more entries than this
const MAX_BATCH_ENTRIES: usize = 10;

/// Message group used on FIFO queues when a message has no routing key
const DEFAULT_MESSAGE_GROUP_ID: &str = "default";

/// SQS-backed message queue
pub struct SqsQueue {
    sqs_client: Arc<SqsClient>,
    queue_url: String,
    fifo: bool,
}

impl SqsQueue {
    /// Creates a new SQS queue
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    /// * `config` - Queue configuration including URL
    #[must_use]
    pub fn new(sqs_client: Arc<SqsClient>, config: &QueueConfig) -> Self {
        Self {
            sqs_client,
            queue_url: config.queue_url.clone(),
            fifo: config.is_fifo(),
        }
    }

    fn build_entry(
        &self,
        index: usize,
        message: OutgoingMessage,
    ) -> QueueResult<SendMessageBatchRequestEntry> {
        let mut entry = SendMessageBatchRequestEntry::builder()
            .id(index.to_string())
            .message_body(message.body);

        if let Some(channel) = &message.channel_hint {
            let attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(channel)
                .build()?;
            entry = entry.message_attributes(CHANNEL_ATTRIBUTE, attribute);
        }

        if self.fifo {
            let group_id = message
                .channel_hint
                .unwrap_or_else(|| DEFAULT_MESSAGE_GROUP_ID.to_string());
            entry = entry
                .message_group_id(group_id)
                .message_deduplication_id(Uuid::new_v4().to_string());
        }

        Ok(entry.build()?)
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> QueueResult<Vec<String>> {
        let mut message_ids = Vec::with_capacity(messages.len());
        let mut pending = messages.into_iter().peekable();

        while pending.peek().is_some() {
            let entries = pending
                .by_ref()
                .take(MAX_BATCH_ENTRIES)
                .enumerate()
                .map(|(index, message)| self.build_entry(index, message))
                .collect::<QueueResult<Vec<_>>>()?;

            let result = self
                .sqs_client
                .send_message_batch()
                .queue_url(&self.queue_url)
                .set_entries(Some(entries))
                .send()
                .await?;

            if let Some(failed) = result.failed().first() {
                return Err(QueueError::EntryRejected {
                    code: failed.code().to_string(),
                    message: failed.message().unwrap_or_default().to_string(),
                    sender_fault: failed.sender_fault(),
                });
            }

            message_ids.extend(
                result
                    .successful()
                    .iter()
                    .map(|entry| entry.message_id().to_string()),
            );
        }

        Ok(message_ids)
    }

    async fn poll(&self, options: PollOptions) -> QueueResult<Vec<QueueMessage>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(options.max_messages)
            .visibility_timeout(options.visibility_timeout)
            .wait_time_seconds(options.wait_time_seconds)
            .message_attribute_names(CHANNEL_ATTRIBUTE)
            .send()
            .await?;

        let messages = result
            .messages()
            .iter()
            .filter_map(|msg| {
                let Some(receipt_handle) = msg.receipt_handle() else {
                    // Without a receipt the message can never be acknowledged
                    warn!(message_id = ?msg.message_id(), "Received message without receipt handle");
                    return None;
                };

                let channel_hint = msg
                    .message_attributes()
                    .and_then(|attributes| attributes.get(CHANNEL_ATTRIBUTE))
                    .and_then(MessageAttributeValue::string_value)
                    .map(ToString::to_string);

                Some(QueueMessage {
                    message_id: msg.message_id().unwrap_or_default().to_string(),
                    receipt_handle: receipt_handle.to_string(),
                    body: msg.body().unwrap_or_default().to_string(),
                    channel_hint,
                })
            })
            .collect::<Vec<_>>();

        debug!("Received {} messages from {}", messages.len(), self.queue_url);

        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        let result = self
            .sqs_client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if matches!(
                    err.as_service_error(),
                    Some(DeleteMessageError::ReceiptHandleIsInvalid(_))
                ) =>
            {
                warn!("Ignoring delete with stale receipt handle");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
