use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request to build a digest over several diary entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DigestRequest {
    pub id: String,
    pub entries: Vec<DigestEntry>,
    #[serde(default, alias = "userLocale")]
    pub user_locale: Option<String>,
}

/// A single diary entry as stored by the diary service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigestEntry {
    pub id: String,
    /// Plain date or RFC 3339 timestamp
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default, alias = "image_descriptions")]
    pub image_descriptions: Vec<EntryImageDescription>,
    #[serde(default, alias = "overall_day_summary")]
    pub overall_day_summary: Option<String>,
    #[serde(default)]
    pub questions: Vec<EntryQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntryImageDescription {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntryQuestion {
    #[serde(default)]
    pub index: u32,
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Generated digest, posted to the digest callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigestResponse {
    pub id: String,
    pub period: Period,
    pub title: String,
    pub overall_emotion: Option<String>,
    pub summary: Option<String>,
    pub ai_insights: AiInsights,
    pub entries: Vec<EntryDigest>,
}

/// Inclusive date range covered by a digest, `YYYY-MM-DD`
///
/// Both bounds are empty strings when no entry carried a usable date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Period {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub activity: Option<String>,
    pub emotion_trend: Option<String>,
    pub special_moment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntryDigest {
    pub id: String,
    pub summary: Option<String>,
}
