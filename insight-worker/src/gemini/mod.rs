mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

pub use types::{Content, InlineData, Part, PromptRequest};
use types::GenerateContentResponse;

/// Public Gemini endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Connect timeout for the AI backend
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout for the AI backend; prompts carry inline images
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 90;

/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("AI backend request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("AI backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("AI backend response has no candidate text")]
    EmptyResponse,
}

impl GeminiError {
    /// Whether retrying the same prompt later may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(err) => !err.is_decode(),
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::EmptyResponse => false,
        }
    }
}

/// Generates reply text for a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends the prompt and returns the raw text of the first candidate
    async fn generate(&self, prompt: &PromptRequest) -> Result<String, GeminiError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// HTTP client for the Gemini `generateContent` API
pub struct GeminiClient {
    http_client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    /// Creates a new Gemini client
    ///
    /// # Panics
    ///
    /// If the HTTP client fails to be created
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .expect("Failed to create HTTP client");

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Self {
            http_client,
            endpoint,
            api_key: config.api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &PromptRequest) -> Result<String, GeminiError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(prompt)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status { status, body });
        }

        let text = response
            .json::<GenerateContentResponse>()
            .await?
            .into_text()
            .ok_or(GeminiError::EmptyResponse)?;

        debug!(length = text.len(), "Received AI backend reply");

        Ok(text)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use tokio::sync::Mutex;

    use super::{GeminiError, PromptRequest, TextGenerator};

    enum Reply {
        Text(String),
        Status(StatusCode),
    }

    /// Replays canned replies in order and records every prompt
    #[derive(Default)]
    pub struct MockTextGenerator {
        replies: Mutex<VecDeque<Reply>>,
        prompts: Mutex<Vec<PromptRequest>>,
    }

    impl MockTextGenerator {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Generator that answers every prompt with `text` once
        #[must_use]
        pub fn replying(text: impl Into<String>) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Reply::Text(text.into())])),
                prompts: Mutex::default(),
            }
        }

        pub async fn push_reply(&self, text: impl Into<String>) {
            self.replies.lock().await.push_back(Reply::Text(text.into()));
        }

        pub async fn push_status(&self, status: StatusCode) {
            self.replies.lock().await.push_back(Reply::Status(status));
        }

        /// Prompts received so far
        pub async fn prompts(&self) -> Vec<PromptRequest> {
            self.prompts.lock().await.clone()
        }
    }

    #[async_trait]
    impl TextGenerator for MockTextGenerator {
        async fn generate(&self, prompt: &PromptRequest) -> Result<String, GeminiError> {
            self.prompts.lock().await.push(prompt.clone());

            match self.replies.lock().await.pop_front() {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Status(status)) => Err(GeminiError::Status {
                    status,
                    body: String::new(),
                }),
                None => Err(GeminiError::EmptyResponse),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_classification() {
        let status = |code| GeminiError::Status {
            status: code,
            body: String::new(),
        };

        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(status(StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(!status(StatusCode::BAD_REQUEST).is_transient());
        assert!(!GeminiError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "key".to_string(),
            model: "gemini-2.0-flash-001".to_string(),
            base_url: "http://localhost:9999/".to_string(),
        });

        assert_eq!(
            client.endpoint,
            "http://localhost:9999/v1beta/models/gemini-2.0-flash-001:generateContent"
        );
    }
}
