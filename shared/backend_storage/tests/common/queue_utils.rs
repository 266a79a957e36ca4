//! Queue test setup utilities

#![allow(dead_code)]

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_sqs::Client as SqsClient;
use backend_storage::queue::QueueConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Test context that provides SQS client and queue setup
pub struct QueueTestContext {
    pub sqs_client: Arc<SqsClient>,
    pub queue_url: String,
}

impl QueueTestContext {
    /// Creates a new test context with a unique standard queue
    pub async fn new(test_name: &str) -> Self {
        Self::create(format!("{}-{}", test_name, Uuid::new_v4()), false).await
    }

    /// Creates a new test context with a unique FIFO queue
    pub async fn new_fifo(test_name: &str) -> Self {
        Self::create(format!("{}-{}.fifo", test_name, Uuid::new_v4()), true).await
    }

    async fn create(queue_name: String, fifo: bool) -> Self {
        // Setup LocalStack client with hardcoded credentials for CI
        let credentials = Credentials::from_keys(
            "test", // AWS_ACCESS_KEY_ID
            "test", // AWS_SECRET_ACCESS_KEY
            None,   // no session token
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url("http://localhost:4566")
            .region("us-east-1")
            .credentials_provider(credentials)
            .load()
            .await;

        let sqs_client = Arc::new(SqsClient::new(&config));

        let mut request = sqs_client.create_queue().queue_name(&queue_name);
        if fifo {
            request = request.attributes(aws_sdk_sqs::types::QueueAttributeName::FifoQueue, "true");
        }

        let result = request.send().await.expect("Failed to create test queue");

        let queue_url = result
            .queue_url()
            .expect("Queue URL not returned")
            .to_string();

        Self {
            sqs_client,
            queue_url,
        }
    }

    /// Queue configuration pointing at the test queue
    pub fn queue_config(&self, visibility_timeout: i32) -> QueueConfig {
        QueueConfig {
            queue_url: self.queue_url.clone(),
            default_max_messages: 10,
            default_visibility_timeout: visibility_timeout,
            default_wait_time_seconds: 0, // No wait for tests
        }
    }
}

impl Drop for QueueTestContext {
    fn drop(&mut self) {
        // Clean up the queue
        let client = self.sqs_client.clone();
        let queue_url = self.queue_url.clone();

        // Use tokio runtime to delete queue
        let handle = tokio::runtime::Handle::try_current();
        if let Ok(handle) = handle {
            handle.spawn(async move {
                let _ = client.delete_queue().queue_url(&queue_url).send().await;
            });
        }
    }
}
