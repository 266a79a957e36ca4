use std::str::FromStr;
use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use common_types::{Channel, DigestRequest, VisionRequest};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::producer::QueueProducer;
use crate::types::AppError;

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    accepted: bool,
    /// Transport id of the queued message
    message_id: String,
}

/// Queues an analysis request
///
/// `channel` is `vision` (or `diary`) for image analysis and `digest` for
/// digest generation. The result is delivered to the channel's callback URL.
pub async fn handler(
    Extension(producer): Extension<Arc<QueueProducer>>,
    Path(channel): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<EnqueueResponse>, AppError> {
    let channel = Channel::from_str(&channel).map_err(|_| {
        AppError::new(
            StatusCode::BAD_REQUEST,
            "unknown_channel",
            "Unknown channel",
            false,
        )
    })?;

    let message_id = match channel {
        Channel::Vision => {
            let request: VisionRequest = parse_request(body)?;
            producer.try_enqueue(channel, &request).await?
        }
        Channel::Digest => {
            let request: DigestRequest = parse_request(body)?;
            producer.try_enqueue(channel, &request).await?
        }
    };

    Ok(Json(EnqueueResponse {
        accepted: true,
        message_id,
    }))
}

fn parse_request<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| {
        tracing::debug!("Invalid analysis request: {e}");
        AppError::new(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Request body does not match the channel",
            false,
        )
    })
}
