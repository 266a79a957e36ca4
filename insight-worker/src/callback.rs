use std::time::Duration;

use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

/// Connect timeout for callback endpoints
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Request timeout for callback endpoints
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// How a callback attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Endpoint answered with a 2xx status
    Delivered(u16),
    /// Endpoint answered with a non-2xx status
    Rejected(u16),
    /// Request could not be sent or timed out
    Failed,
}

impl CallbackOutcome {
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Best-effort result delivery over HTTP
///
/// Every result is posted once. Failures are logged and reported through the
/// returned outcome; they are never retried.
pub struct CallbackSender {
    http_client: Client,
}

impl CallbackSender {
    /// Creates a new callback sender
    ///
    /// # Panics
    ///
    /// If the HTTP client fails to be created
    #[must_use]
    pub fn new() -> Self {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client }
    }

    /// Posts `payload` as JSON to `url`
    ///
    /// The response body is not read.
    pub async fn send<T: Serialize + Sync>(&self, url: &str, payload: &T) -> CallbackOutcome {
        let result = self.http_client.post(url).json(payload).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                info!(callback_url = url, status, "Callback delivered");
                counter!("callback_delivered").increment(1);
                CallbackOutcome::Delivered(status)
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(callback_url = url, status, "Callback endpoint rejected result");
                counter!("callback_failed").increment(1);
                CallbackOutcome::Rejected(status)
            }
            Err(err) if err.is_builder() => {
                error!(callback_url = url, "Failed to build callback request: {err}");
                counter!("callback_failed").increment(1);
                CallbackOutcome::Failed
            }
            Err(err) => {
                error!(callback_url = url, "Failed to deliver callback: {err}");
                counter!("callback_failed").increment(1);
                CallbackOutcome::Failed
            }
        }
    }
}

impl Default for CallbackSender {
    fn default() -> Self {
        Self::new()
    }
}
