use common_types::Channel;
use thiserror::Error;

use crate::gemini::GeminiError;
use crate::reconcile::ReconcileError;

/// Failure while processing a single queue message
///
/// Transient failures leave the message in the queue so it is redelivered
/// after its visibility timeout. Everything else is permanent and the message
/// is deleted after logging.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("message content could not be decoded: {0}")]
    Decode(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("unrecognized message structure, top-level keys: {keys:?}")]
    UnrecognizedShape { keys: Vec<String> },

    #[error("invalid {channel} request: {source}")]
    InvalidRequest {
        channel: Channel,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to download image {image_id}: {reason}")]
    ImageDownload { image_id: String, reason: String },

    /// The image reference can never be fetched: bad URL, 4xx or empty body
    #[error("image {image_id} is unavailable: {reason}")]
    ImageUnavailable { image_id: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] ReconcileError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),
}

impl ProcessError {
    /// Whether a redelivery of the same message may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ImageDownload { .. } => true,
            Self::Gemini(err) => err.is_transient(),
            Self::Decode(_)
            | Self::UnknownChannel(_)
            | Self::UnrecognizedShape { .. }
            | Self::InvalidRequest { .. }
            | Self::ImageUnavailable { .. }
            | Self::Upstream(_) => false,
        }
    }
}
