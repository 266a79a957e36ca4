use std::sync::Arc;

use backend_storage::queue::{MessageQueue, OutgoingMessage, QueueError};
use common_types::Channel;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::queue_processor::codec;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("queue accepted the message without returning an id")]
    MissingMessageId,
}

/// Enqueues analysis requests
///
/// Each request is written as one base64 logical envelope with the channel
/// also attached as routing metadata.
pub struct QueueProducer {
    queue: Arc<dyn MessageQueue>,
}

impl QueueProducer {
    #[must_use]
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self { queue }
    }

    /// Enqueues a request and returns the transport message id
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be serialized or the transport
    /// rejects the write
    pub async fn try_enqueue<T: Serialize + Sync>(
        &self,
        channel: Channel,
        request: &T,
    ) -> Result<String, ProducerError> {
        let body = codec::encode(channel.as_str(), request)?;
        let message = OutgoingMessage::new(body, Some(channel.as_str().to_string()));

        let message_id = self
            .queue
            .send_batch(vec![message])
            .await?
            .into_iter()
            .next()
            .ok_or(ProducerError::MissingMessageId)?;

        info!(message_id, channel = %channel, "Enqueued analysis request");

        Ok(message_id)
    }

    /// Enqueues a request, logging instead of returning failures
    ///
    /// No retry is attempted; callers needing confirmation use
    /// [`Self::try_enqueue`].
    pub async fn enqueue<T: Serialize + Sync>(&self, channel: Channel, request: &T) -> Option<String> {
        match self.try_enqueue(channel, request).await {
            Ok(message_id) => Some(message_id),
            Err(err) => {
                error!(channel = %channel, "Failed to enqueue analysis request: {err}");
                None
            }
        }
    }
}
