use serde::{Deserialize, Serialize};

/// Prompt sent to `generateContent`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptRequest {
    pub contents: Vec<Content>,
}

impl PromptRequest {
    /// Starts a prompt with a system instruction, sent with the `model` role
    #[must_use]
    pub fn with_system_prompt(system_prompt: &str) -> Self {
        Self {
            contents: vec![Content::new("model", vec![Part::text(system_prompt)])],
        }
    }

    /// Appends a `user` turn
    #[must_use]
    pub fn user(mut self, parts: Vec<Part>) -> Self {
        self.contents.push(Content::new("user", parts));
        self
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    #[must_use]
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }
}

/// Ordered content block: text or inline base64 data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

/// Subset of the `generateContent` response that carries the reply text
#[derive(Debug, Default, Deserialize)]
pub(super) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    pub(super) fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}
