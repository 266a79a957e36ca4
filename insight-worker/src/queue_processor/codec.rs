//! Wire codec for queued messages
//!
//! The canonical form is a base64 wrapped JSON logical envelope
//! `{"channel": "...", "data": {...}}`. Older producers send the raw request
//! JSON with the channel, if any, in message metadata.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ProcessError;

/// Channel and request payload carried inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalEnvelope {
    pub channel: String,
    pub data: Value,
}

/// Decoded message content
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedContent {
    /// `{channel, data}` envelope
    Envelope { channel: String, data: Value },
    /// Any other JSON document, the request itself
    Raw(Value),
}

impl DecodedContent {
    /// Channel named inside the content, if any
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Envelope { channel, .. } => Some(channel),
            Self::Raw(_) => None,
        }
    }

    /// Request payload to hand to the handler
    #[must_use]
    pub fn into_payload(self) -> Value {
        match self {
            Self::Envelope { data, .. } => data,
            Self::Raw(value) => value,
        }
    }
}

/// Encodes a request as a base64 wrapped logical envelope
///
/// # Errors
///
/// Returns an error if `data` cannot be serialized to JSON
pub fn encode<T: Serialize>(channel: &str, data: &T) -> Result<String, serde_json::Error> {
    let envelope = LogicalEnvelope {
        channel: channel.to_string(),
        data: serde_json::to_value(data)?,
    };

    Ok(STANDARD.encode(serde_json::to_vec(&envelope)?))
}

/// Decodes message content
///
/// Content that is not plain JSON is base64 decoded first. A JSON object
/// with a string `channel` and a `data` field is an envelope; `data` may itself
/// be a JSON string holding the request.
///
/// # Errors
///
/// Returns [`ProcessError::Decode`] when the content is neither JSON nor
/// base64 wrapped JSON
pub fn decode(content: &str) -> Result<DecodedContent, ProcessError> {
    let trimmed = content.trim();

    let json = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        trimmed.as_bytes().to_vec()
    } else {
        STANDARD
            .decode(trimmed)
            .map_err(|err| ProcessError::Decode(format!("invalid base64: {err}")))?
    };

    let value: Value = serde_json::from_slice(&json)
        .map_err(|err| ProcessError::Decode(format!("invalid JSON: {err}")))?;

    Ok(into_envelope(value))
}

fn into_envelope(value: Value) -> DecodedContent {
    let Value::Object(mut object) = value else {
        return DecodedContent::Raw(value);
    };

    let is_envelope =
        matches!(object.get("channel"), Some(Value::String(_))) && object.contains_key("data");
    if !is_envelope {
        return DecodedContent::Raw(Value::Object(object));
    }

    let (Some(Value::String(channel)), Some(data)) = (object.remove("channel"), object.remove("data"))
    else {
        return DecodedContent::Raw(Value::Object(object));
    };

    // Some producers serialize the request twice
    let data = match data {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    };

    DecodedContent::Envelope { channel, data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_encoded_envelope() {
        let content = encode("digest", &json!({"id": "d1", "entries": []})).unwrap();

        assert_eq!(
            decode(&content).unwrap(),
            DecodedContent::Envelope {
                channel: "digest".to_string(),
                data: json!({"id": "d1", "entries": []}),
            }
        );
    }

    #[test]
    fn test_decode_plain_json_envelope() {
        let decoded = decode(r#"{"channel":"diary","data":{"images":[]}}"#).unwrap();

        assert_eq!(decoded.channel(), Some("diary"));
        assert_eq!(decoded.into_payload(), json!({"images": []}));
    }

    #[test]
    fn test_decode_raw_request() {
        let decoded = decode(r#" {"images":[{"id":"a","url":"http://x"}],"user_locale":"ko"}"#).unwrap();

        assert_eq!(decoded.channel(), None);
        assert_eq!(
            decoded.into_payload(),
            json!({"images":[{"id":"a","url":"http://x"}],"user_locale":"ko"})
        );
    }

    #[test]
    fn test_decode_base64_raw_request() {
        let content = STANDARD.encode(r#"{"entries":[]}"#);

        assert_eq!(
            decode(&content).unwrap(),
            DecodedContent::Raw(json!({"entries": []}))
        );
    }

    #[test]
    fn test_decode_stringified_data() {
        let decoded = decode(r#"{"channel":"digest","data":"{\"id\":\"d1\"}"}"#).unwrap();

        assert_eq!(decoded.into_payload(), json!({"id": "d1"}));
    }

    #[test]
    fn test_non_string_channel_is_not_an_envelope() {
        let decoded = decode(r#"{"channel":3,"data":{}}"#).unwrap();

        assert_eq!(decoded.channel(), None);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode("%%% not base64"), Err(ProcessError::Decode(_))));
        assert!(matches!(
            decode(&STANDARD.encode("plain text")),
            Err(ProcessError::Decode(_))
        ));
    }
}
