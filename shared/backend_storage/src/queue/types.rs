/// Message received from the queue, with the metadata needed to acknowledge it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Message ID, used for logging and tracing only
    pub message_id: String,
    /// Receipt handle for deleting the message, valid until the visibility timeout expires
    pub receipt_handle: String,
    /// Raw message body
    pub body: String,
    /// Out-of-band routing key set by the producer, if any
    pub channel_hint: Option<String>,
}

/// Message to enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Raw message body
    pub body: String,
    /// Routing key attached as message metadata
    pub channel_hint: Option<String>,
}

impl OutgoingMessage {
    /// Creates a message carrying the given routing key
    #[must_use]
    pub fn new(body: impl Into<String>, channel_hint: Option<String>) -> Self {
        Self {
            body: body.into(),
            channel_hint,
        }
    }
}

/// Parameters for a single receive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Maximum number of messages to receive (SQS accepts 1 to 10)
    pub max_messages: i32,
    /// Seconds a received message stays hidden from other receivers
    pub visibility_timeout: i32,
    /// Long polling wait time in seconds
    pub wait_time_seconds: i32,
}

/// Configuration for queue operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Queue URL
    pub queue_url: String,
    /// Default maximum number of messages to retrieve
    pub default_max_messages: i32,
    /// Default visibility timeout for messages (in seconds)
    pub default_visibility_timeout: i32,
    /// Default wait time for long polling
    pub default_wait_time_seconds: i32,
}

impl QueueConfig {
    /// Receive parameters derived from the configured defaults
    #[must_use]
    pub const fn poll_options(&self) -> PollOptions {
        PollOptions {
            max_messages: self.default_max_messages,
            visibility_timeout: self.default_visibility_timeout,
            wait_time_seconds: self.default_wait_time_seconds,
        }
    }

    /// Whether the queue is a FIFO queue, which requires a message group ID
    #[must_use]
    pub fn is_fifo(&self) -> bool {
        self.queue_url.ends_with(".fifo")
    }
}
