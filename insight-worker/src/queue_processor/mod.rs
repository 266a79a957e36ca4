pub mod classifier;
pub mod codec;

use std::sync::Arc;
use std::time::Duration;

use backend_storage::queue::{MessageQueue, PollOptions, QueueError, QueueMessage};
use metrics::counter;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Span};

use crate::callback::{self, CallbackSender};
use crate::dispatch::{DispatchResult, DispatchTable};
use crate::types::ProcessError;
use crate::{gemini, services};

/// Worst-case handling time of one message
pub const MAX_HANDLER_LATENCY: Duration = Duration::from_secs(
    services::DOWNLOAD_BUDGET_SECS + gemini::REQUEST_TIMEOUT_SECS + callback::REQUEST_TIMEOUT_SECS,
);

/// Shortest accepted poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll loop settings
///
/// `poll_options.visibility_timeout` must exceed [`MAX_HANDLER_LATENCY`],
/// otherwise a message still being handled becomes visible again and is
/// processed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// When false the processor never touches the queue
    pub enabled: bool,
    pub poll_interval: Duration,
    pub poll_options: PollOptions,
}

impl ProcessorConfig {
    /// Whether a received message stays hidden for as long as its handling can take
    #[must_use]
    pub fn visibility_covers_handler_latency(&self) -> bool {
        u64::try_from(self.poll_options.visibility_timeout)
            .is_ok_and(|secs| secs > MAX_HANDLER_LATENCY.as_secs())
    }
}

/// Terminal handling of a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Handled and deleted; the callback was attempted
    Processed,
    /// Permanent failure, logged and deleted
    Dropped,
    /// Transient failure, left for redelivery
    Retried,
}

/// Outcome counts of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub dropped: usize,
    pub retried: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Processed => self.processed += 1,
            MessageOutcome::Dropped => self.dropped += 1,
            MessageOutcome::Retried => self.retried += 1,
        }
    }
}

/// Single poller over the analysis queue
///
/// Messages of a batch are handled one after another within the poll cycle.
/// Running several processors against one queue is safe but may process a
/// message twice.
pub struct QueueProcessor {
    queue: Arc<dyn MessageQueue>,
    dispatch: Arc<DispatchTable>,
    callback: Arc<CallbackSender>,
    config: ProcessorConfig,
    shutdown: CancellationToken,
}

impl QueueProcessor {
    #[must_use]
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        dispatch: Arc<DispatchTable>,
        callback: Arc<CallbackSender>,
        config: ProcessorConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            dispatch,
            callback,
            config,
            shutdown,
        }
    }

    /// Polls on a fixed interval until shutdown
    ///
    /// A cycle in progress always finishes; ticks that fire meanwhile are
    /// skipped.
    pub async fn start(self) {
        if !self.config.enabled {
            info!("Queue processor disabled");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis(),
            max_messages = self.config.poll_options.max_messages,
            "Starting QueueProcessor"
        );

        if !self.config.visibility_covers_handler_latency() {
            warn!(
                visibility_timeout = self.config.poll_options.visibility_timeout,
                max_handler_latency_secs = MAX_HANDLER_LATENCY.as_secs(),
                "Visibility timeout is shorter than the worst-case handling time, slow messages may be processed twice"
            );
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.shutdown.cancelled() => {
                    info!("Queue poller shutting down");
                    break;
                }
            }

            match self.poll_once().await {
                Ok(summary) if summary == BatchSummary::default() => {}
                Ok(summary) => debug!(?summary, "Poll cycle finished"),
                Err(e) => error!(error = ?e, transient = e.is_transient(), "Failed to poll messages"),
            }
        }

        info!("QueueProcessor shutdown complete");
    }

    /// Receives one batch and handles every message in it
    ///
    /// # Errors
    ///
    /// Returns an error only when the batch cannot be received. Per-message
    /// failures are contained and counted in the summary.
    pub async fn poll_once(&self) -> Result<BatchSummary, QueueError> {
        let messages = self.queue.poll(self.config.poll_options).await?;

        let mut summary = BatchSummary::default();
        for message in messages {
            summary.record(self.handle_message(message).await);
        }

        Ok(summary)
    }

    #[instrument(skip(self, message), fields(message_id = %message.message_id, channel))]
    async fn handle_message(&self, message: QueueMessage) -> MessageOutcome {
        match self.process(&message).await {
            Ok(result) => {
                // Delivery is best effort and never blocks the delete
                self.callback
                    .send(&result.callback_target, &result.payload)
                    .await;
                self.delete(&message).await;

                info!("Processed message");
                counter!("queue_message_processed", "channel" => result.channel.as_str())
                    .increment(1);
                MessageOutcome::Processed
            }
            Err(err) if err.is_transient() => {
                warn!("Transient failure, leaving message for redelivery: {err}");
                counter!("queue_message_retried").increment(1);
                MessageOutcome::Retried
            }
            Err(err) => {
                error!(raw_content = %message.body, "Dropping message: {err}");
                self.delete(&message).await;
                counter!("queue_message_dropped").increment(1);
                MessageOutcome::Dropped
            }
        }
    }

    async fn process(&self, message: &QueueMessage) -> Result<DispatchResult, ProcessError> {
        let content = codec::decode(&message.body)?;
        let classification = classifier::classify(message.channel_hint.as_deref(), &content)?;

        Span::current().record("channel", classification.channel.as_str());
        debug!(source = ?classification.source, "Classified message");

        self.dispatch
            .dispatch(classification.channel, content.into_payload())
            .await
    }

    async fn delete(&self, message: &QueueMessage) {
        // A failed delete only means the message comes back later
        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            error!(error = ?e, "Failed to delete message");
        }
    }
}
