//! Queue operations for the diary insight worker
//!
//! This module provides the transport seam between the producer and the queue
//! processor, backed by AWS SQS in deployed environments.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Error types for queue operations
pub mod error;
/// In-memory queue with visibility timeout semantics
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
/// AWS SQS queue implementation
pub mod sqs_queue;
/// Common types for queue operations
pub mod types;

use async_trait::async_trait;

pub use error::{QueueError, QueueResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryQueue;
pub use sqs_queue::SqsQueue;
pub use types::{OutgoingMessage, PollOptions, QueueConfig, QueueMessage};

/// Transport operations required by the producer and the queue processor
///
/// Messages are read, not removed, by [`MessageQueue::poll`]. A received message
/// stays hidden for the visibility timeout and is redelivered unless it is
/// deleted with its receipt handle before the timeout elapses.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueues a batch of messages and returns the transport-assigned message IDs
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the transport rejects the batch or any entry in it
    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> QueueResult<Vec<String>>;

    /// Receives up to `options.max_messages` messages
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the receive operation fails
    async fn poll(&self, options: PollOptions) -> QueueResult<Vec<QueueMessage>>;

    /// Deletes a received message by its receipt handle
    ///
    /// Deleting with a stale or already used receipt handle is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the transport fails for any other reason
    async fn delete(&self, receipt_handle: &str) -> QueueResult<()>;
}
