use std::{env, str::FromStr, time::Duration};

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use backend_storage::queue::QueueConfig;

use crate::dispatch::CallbackUrls;
use crate::gemini::{GeminiConfig, DEFAULT_BASE_URL};
use crate::queue_processor::{ProcessorConfig, MIN_POLL_INTERVAL};

/// SQS accepts between 1 and 10 messages per receive
const MAX_BATCH_SIZE: i32 = 10;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        // Must exceed the long-poll wait time
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Returns the analysis queue configuration
    ///
    /// # Panics
    ///
    /// Panics if the `QUEUE_URL` environment variable is not set in production/staging,
    /// or if a numeric queue setting is not a valid number
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        let queue_url = match self {
            Self::Production | Self::Staging => {
                env::var("QUEUE_URL").expect("QUEUE_URL environment variable is not set")
            }
            Self::Development => env::var("QUEUE_URL").unwrap_or_else(|_| {
                "http://localhost:4566/000000000000/diary-insight-queue".to_string()
            }),
        };

        QueueConfig {
            queue_url,
            default_max_messages: parse_var("QUEUE_BATCH_SIZE", 5).clamp(1, MAX_BATCH_SIZE),
            // Must exceed the worst-case handling time of a message
            default_visibility_timeout: parse_var("QUEUE_VISIBILITY_TIMEOUT_SECS", 300),
            default_wait_time_seconds: parse_var("QUEUE_WAIT_TIME_SECS", 0),
        }
    }

    /// Returns the queue processor configuration
    ///
    /// # Panics
    ///
    /// Panics if a queue setting is not valid
    #[must_use]
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            enabled: parse_var("QUEUE_CONSUMER_ENABLED", true),
            poll_interval: Duration::from_millis(parse_var("QUEUE_POLL_INTERVAL_MS", 5000))
                .max(MIN_POLL_INTERVAL),
            poll_options: self.queue_config().poll_options(),
        }
    }

    /// Returns the callback endpoints per channel
    ///
    /// # Panics
    ///
    /// Panics if `CALLBACK_DIARY_URL` or `CALLBACK_DIGEST_URL` is not set in production/staging
    #[must_use]
    pub fn callback_urls(&self) -> CallbackUrls {
        match self {
            Self::Production | Self::Staging => CallbackUrls {
                diary: env::var("CALLBACK_DIARY_URL")
                    .expect("CALLBACK_DIARY_URL environment variable is not set"),
                digest: env::var("CALLBACK_DIGEST_URL")
                    .expect("CALLBACK_DIGEST_URL environment variable is not set"),
            },
            Self::Development => CallbackUrls {
                diary: env::var("CALLBACK_DIARY_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/api/v1/diary/callback".to_string()),
                digest: env::var("CALLBACK_DIGEST_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/api/v1/digest/callback".to_string()),
            },
        }
    }

    /// Returns the Gemini client configuration
    ///
    /// # Panics
    ///
    /// Panics if the `GEMINI_API_KEY` environment variable is not set in production/staging
    #[must_use]
    pub fn gemini_config(&self) -> GeminiConfig {
        let api_key = match self {
            Self::Production | Self::Staging => {
                env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY environment variable is not set")
            }
            Self::Development => env::var("GEMINI_API_KEY").unwrap_or_default(),
        };

        GeminiConfig {
            api_key,
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-001".to_string()),
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Datadog agent host, when metrics should be exported
    #[must_use]
    pub fn dd_agent_host(&self) -> Option<String> {
        env::var("DD_AGENT_HOST").ok().filter(|host| !host.is_empty())
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }
}

/// Reads and parses an optional variable
///
/// # Panics
///
/// Panics if the variable is set but cannot be parsed
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} environment variable is not valid: {e}")),
        _ => default,
    }
}
