//! Channel to handler routing
//!
//! The dispatch layer only converts types and picks the callback URL. Callback
//! URLs come from configuration, never from message content.

use std::sync::Arc;

use async_trait::async_trait;
use common_types::{Channel, DigestRequest, DigestResponse, VisionRequest, VisionResponse};
use serde::Serialize;
use serde_json::Value;

use crate::types::ProcessError;

/// Analyzes diary images
#[async_trait]
pub trait VisionHandler: Send + Sync {
    async fn analyze(&self, request: VisionRequest) -> Result<VisionResponse, ProcessError>;
}

/// Builds a digest over several diary entries
#[async_trait]
pub trait DigestHandler: Send + Sync {
    async fn create_digest(&self, request: DigestRequest) -> Result<DigestResponse, ProcessError>;
}

/// Callback endpoint per channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub diary: String,
    pub digest: String,
}

impl CallbackUrls {
    #[must_use]
    pub fn for_channel(&self, channel: Channel) -> &str {
        match channel {
            Channel::Vision => &self.diary,
            Channel::Digest => &self.digest,
        }
    }
}

/// Handler output, serialized as the bare response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchPayload {
    Vision(VisionResponse),
    Digest(DigestResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub channel: Channel,
    pub payload: DispatchPayload,
    pub callback_target: String,
}

pub struct DispatchTable {
    vision: Arc<dyn VisionHandler>,
    digest: Arc<dyn DigestHandler>,
    callback_urls: CallbackUrls,
}

impl DispatchTable {
    #[must_use]
    pub fn new(
        vision: Arc<dyn VisionHandler>,
        digest: Arc<dyn DigestHandler>,
        callback_urls: CallbackUrls,
    ) -> Self {
        Self {
            vision,
            digest,
            callback_urls,
        }
    }

    /// Deserializes `data` into the channel's request and runs its handler
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::InvalidRequest`] when `data` does not match the
    /// channel's request shape, or the handler's error
    pub async fn dispatch(
        &self,
        channel: Channel,
        data: Value,
    ) -> Result<DispatchResult, ProcessError> {
        let payload = match channel {
            Channel::Vision => {
                let request = deserialize_request(channel, data)?;
                DispatchPayload::Vision(self.vision.analyze(request).await?)
            }
            Channel::Digest => {
                let request = deserialize_request(channel, data)?;
                DispatchPayload::Digest(self.digest.create_digest(request).await?)
            }
        };

        Ok(DispatchResult {
            channel,
            payload,
            callback_target: self.callback_urls.for_channel(channel).to_string(),
        })
    }
}

fn deserialize_request<T: serde::de::DeserializeOwned>(
    channel: Channel,
    data: Value,
) -> Result<T, ProcessError> {
    serde_json::from_value(data).map_err(|source| ProcessError::InvalidRequest { channel, source })
}
