//! Channel classification for dequeued messages
//!
//! Precedence: routing metadata, then the channel inside a logical envelope,
//! then structural sniffing of the payload.

use std::str::FromStr;

use common_types::Channel;
use serde_json::Value;

use super::codec::DecodedContent;
use crate::types::ProcessError;

/// Structural rules for payloads without any channel, evaluated in order.
/// A rule matches when the top-level field exists and is an array.
const SHAPE_RULES: &[(&str, Channel)] = &[
    ("images", Channel::Vision),
    ("imgPars", Channel::Vision),
    ("entries", Channel::Digest),
];

/// What decided the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Metadata,
    Envelope,
    /// Matched the structural rule for this field
    Shape(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub channel: Channel,
    pub source: ClassificationSource,
}

/// Determines the channel of a message
///
/// # Errors
///
/// - [`ProcessError::UnknownChannel`] when the metadata or envelope names a
///   channel outside the recognized set
/// - [`ProcessError::UnrecognizedShape`] when nothing identifies the channel
pub fn classify(
    channel_hint: Option<&str>,
    content: &DecodedContent,
) -> Result<Classification, ProcessError> {
    if let Some(hint) = channel_hint.map(str::trim).filter(|hint| !hint.is_empty()) {
        return Ok(Classification {
            channel: parse_channel(hint)?,
            source: ClassificationSource::Metadata,
        });
    }

    match content {
        DecodedContent::Envelope { channel, .. } => Ok(Classification {
            channel: parse_channel(channel)?,
            source: ClassificationSource::Envelope,
        }),
        DecodedContent::Raw(value) => classify_shape(value),
    }
}

fn parse_channel(value: &str) -> Result<Channel, ProcessError> {
    Channel::from_str(value.trim()).map_err(|_| ProcessError::UnknownChannel(value.to_string()))
}

fn classify_shape(value: &Value) -> Result<Classification, ProcessError> {
    let Value::Object(object) = value else {
        return Err(ProcessError::UnrecognizedShape { keys: Vec::new() });
    };

    SHAPE_RULES
        .iter()
        .find(|(field, _)| object.get(*field).is_some_and(Value::is_array))
        .map(|&(field, channel)| Classification {
            channel,
            source: ClassificationSource::Shape(field),
        })
        .ok_or_else(|| ProcessError::UnrecognizedShape {
            keys: object.keys().cloned().collect(),
        })
}
