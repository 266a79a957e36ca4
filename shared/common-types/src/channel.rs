use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Logical routing key of a queued analysis request.
///
/// `"diary"` and `"vision"` are synonyms and route to the same handler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Channel {
    /// Diary image analysis
    #[serde(alias = "diary")]
    #[strum(to_string = "vision", serialize = "diary")]
    Vision,
    /// Multi-entry digest generation
    #[strum(to_string = "digest")]
    Digest,
}

impl Channel {
    /// Canonical wire value of the channel
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Digest => "digest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_diary_and_vision_are_synonyms() {
        assert_eq!(Channel::from_str("diary").unwrap(), Channel::Vision);
        assert_eq!(Channel::from_str("vision").unwrap(), Channel::Vision);
        assert_eq!(Channel::from_str("DIARY").unwrap(), Channel::Vision);
        assert_eq!(Channel::from_str("Digest").unwrap(), Channel::Digest);
    }

    #[test]
    fn test_unknown_channel_is_rejected() {
        assert!(Channel::from_str("foo").is_err());
        assert!(Channel::from_str("").is_err());
    }

    #[test]
    fn test_display_uses_canonical_value() {
        assert_eq!(Channel::Vision.to_string(), "vision");
        assert_eq!(Channel::Digest.to_string(), "digest");
        assert_eq!(Channel::Vision.as_str(), "vision");
    }

    #[test]
    fn test_serde_accepts_alias() {
        let channel: Channel = serde_json::from_str("\"diary\"").unwrap();
        assert_eq!(channel, Channel::Vision);
        assert_eq!(serde_json::to_string(&Channel::Digest).unwrap(), "\"digest\"");
    }
}
