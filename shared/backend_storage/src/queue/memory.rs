//! In-memory queue for tests
//!
//! Mirrors the SQS receive/delete contract: a received message is hidden for
//! the visibility timeout, every receive issues a fresh receipt handle and
//! only the latest receipt can delete the message.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::queue::{
    error::{QueueError, QueueResult},
    types::{OutgoingMessage, PollOptions, QueueMessage},
    MessageQueue,
};

#[derive(Debug)]
struct StoredMessage {
    message_id: String,
    body: String,
    channel_hint: Option<String>,
    receive_count: u32,
    receipt_handle: Option<String>,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    messages: Vec<StoredMessage>,
    next_id: u64,
    deleted_message_ids: Vec<String>,
    unavailable: bool,
}

/// Queue held in process memory
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<State>,
}

impl InMemoryQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages not yet deleted, visible or not
    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Whether every message has been deleted
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// IDs of deleted messages, in deletion order
    pub async fn deleted_message_ids(&self) -> Vec<String> {
        self.state.lock().await.deleted_message_ids.clone()
    }

    /// Simulates the transport being unreachable
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    fn check_available(state: &State) -> QueueResult<()> {
        if state.unavailable {
            return Err(QueueError::Unavailable("in-memory queue offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> QueueResult<Vec<String>> {
        let mut state = self.state.lock().await;
        Self::check_available(&state)?;

        let now = Instant::now();
        let mut message_ids = Vec::with_capacity(messages.len());
        for message in messages {
            state.next_id += 1;
            let message_id = format!("msg-{}", state.next_id);
            state.messages.push(StoredMessage {
                message_id: message_id.clone(),
                body: message.body,
                channel_hint: message.channel_hint,
                receive_count: 0,
                receipt_handle: None,
                visible_at: now,
            });
            message_ids.push(message_id);
        }

        Ok(message_ids)
    }

    async fn poll(&self, options: PollOptions) -> QueueResult<Vec<QueueMessage>> {
        let mut state = self.state.lock().await;
        Self::check_available(&state)?;

        let now = Instant::now();
        let hidden_until =
            now + Duration::from_secs(u64::try_from(options.visibility_timeout).unwrap_or(0));
        let limit = usize::try_from(options.max_messages).unwrap_or(0);

        let received = state
            .messages
            .iter_mut()
            .filter(|message| message.visible_at <= now)
            .take(limit)
            .map(|message| {
                message.receive_count += 1;
                let receipt_handle = format!("{}-receipt-{}", message.message_id, message.receive_count);
                message.receipt_handle = Some(receipt_handle.clone());
                message.visible_at = hidden_until;

                QueueMessage {
                    message_id: message.message_id.clone(),
                    receipt_handle,
                    body: message.body.clone(),
                    channel_hint: message.channel_hint.clone(),
                }
            })
            .collect();

        Ok(received)
    }

    async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        Self::check_available(&state)?;

        let position = state
            .messages
            .iter()
            .position(|message| message.receipt_handle.as_deref() == Some(receipt_handle));

        // Stale or already used receipts are ignored, like SQS does
        if let Some(position) = position {
            let message = state.messages.remove(position);
            state.deleted_message_ids.push(message.message_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMMEDIATE: PollOptions = PollOptions {
        max_messages: 10,
        visibility_timeout: 0,
        wait_time_seconds: 0,
    };

    const HIDDEN: PollOptions = PollOptions {
        max_messages: 10,
        visibility_timeout: 60,
        wait_time_seconds: 0,
    };

    #[tokio::test]
    async fn test_received_message_is_hidden_until_timeout() {
        let queue = InMemoryQueue::new();
        queue
            .send_batch(vec![OutgoingMessage::new("body", None)])
            .await
            .unwrap();

        assert_eq!(queue.poll(HIDDEN).await.unwrap().len(), 1);
        assert!(queue.poll(HIDDEN).await.unwrap().is_empty());
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_redelivery_issues_new_receipt() {
        let queue = InMemoryQueue::new();
        queue
            .send_batch(vec![OutgoingMessage::new("body", Some("digest".to_string()))])
            .await
            .unwrap();

        let first = queue.poll(IMMEDIATE).await.unwrap().remove(0);
        let second = queue.poll(IMMEDIATE).await.unwrap().remove(0);

        assert_eq!(first.message_id, second.message_id);
        assert_ne!(first.receipt_handle, second.receipt_handle);
        assert_eq!(second.channel_hint.as_deref(), Some("digest"));

        // The superseded receipt no longer deletes anything
        queue.delete(&first.receipt_handle).await.unwrap();
        assert_eq!(queue.len().await, 1);

        queue.delete(&second.receipt_handle).await.unwrap();
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_double_delete_is_noop() {
        let queue = InMemoryQueue::new();
        queue
            .send_batch(vec![OutgoingMessage::new("body", None)])
            .await
            .unwrap();
        let message = queue.poll(HIDDEN).await.unwrap().remove(0);

        queue.delete(&message.receipt_handle).await.unwrap();
        queue.delete(&message.receipt_handle).await.unwrap();

        assert_eq!(queue.deleted_message_ids().await, vec![message.message_id]);
    }

    #[tokio::test]
    async fn test_poll_respects_batch_limit() {
        let queue = InMemoryQueue::new();
        let batch = (0..4)
            .map(|i| OutgoingMessage::new(format!("body-{i}"), None))
            .collect();
        queue.send_batch(batch).await.unwrap();

        let options = PollOptions {
            max_messages: 3,
            ..HIDDEN
        };
        assert_eq!(queue.poll(options).await.unwrap().len(), 3);
        assert_eq!(queue.poll(options).await.unwrap().len(), 1);
    }
}
