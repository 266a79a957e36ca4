//! Reconciliation of free-form AI replies into structured responses
//!
//! Replies are expected to be JSON, but models wrap it in Markdown fences or
//! answer in prose. Fences are stripped before parsing. For vision replies a
//! line-sectioned parser recovers what it can from prose.

mod sections;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use sections::{parse_sections, SectionedText};

/// Failure to turn a reply into a structured response
///
/// Always carries the raw reply so it can be logged for diagnosis.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("reply is not valid JSON for the expected shape: {source}; raw reply: {raw}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("reply has neither JSON nor recognizable sections; raw reply: {raw}")]
    Unstructured { raw: String },
}

impl ReconcileError {
    /// Raw reply text that could not be reconciled
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::MalformedJson { raw, .. } | Self::Unstructured { raw } => raw,
        }
    }
}

/// Result of the two-stage vision reconciliation
#[derive(Debug)]
pub enum Reconciled<T> {
    /// Reply parsed as JSON
    Structured(T),
    /// Reply was prose, recovered through section headers
    Sectioned(SectionedText),
}

/// Strips Markdown code fences around a reply
///
/// Removes a leading fence with an optional `json` tag and a trailing fence,
/// then trims whitespace. Text without fences is returned trimmed.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parses a reply as JSON after stripping code fences
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedJson`] with the raw reply when the
/// stripped text does not deserialize into `T`
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, ReconcileError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|source| {
        ReconcileError::MalformedJson {
            source,
            raw: raw.to_string(),
        }
    })
}

/// Parses a reply as JSON, falling back to section parsing
///
/// # Errors
///
/// Returns [`ReconcileError::Unstructured`] when the reply is neither valid
/// JSON nor contains any recognizable section
pub fn reconcile_with_sections<T: DeserializeOwned>(
    raw: &str,
) -> Result<Reconciled<T>, ReconcileError> {
    match parse_json(raw) {
        Ok(parsed) => Ok(Reconciled::Structured(parsed)),
        Err(err) => {
            tracing::debug!("Reply is not JSON, trying section parser: {err}");

            let sectioned = parse_sections(strip_code_fences(raw));
            if sectioned.is_empty() {
                return Err(ReconcileError::Unstructured {
                    raw: raw.to_string(),
                });
            }
            Ok(Reconciled::Sectioned(sectioned))
        }
    }
}
