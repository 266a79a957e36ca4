use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common_types::{
    AiInsights, Channel, DigestEntry, DigestRequest, DigestResponse, EntryDigest, EntryQuestion, Period,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::dispatch::DigestHandler;
use crate::gemini::{Part, PromptRequest, TextGenerator};
use crate::prompts::PromptType;
use crate::reconcile::parse_json;
use crate::types::ProcessError;

const DEFAULT_TITLE: &str = "다이제스트 요약";

/// Separator between legacy `specialMoments` descriptions
const SPECIAL_MOMENTS_SEPARATOR: &str = "\n\n";

/// Request payload sent to the AI backend, without ids, dates or coordinates
#[derive(Debug, Serialize)]
struct PromptPayload<'a> {
    entries: Vec<PromptEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_locale: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptEntry<'a> {
    index: usize,
    emotion: Option<&'a str>,
    image_descriptions: Vec<PromptImageDescription<'a>>,
    overall_day_summary: Option<&'a str>,
    questions: &'a [EntryQuestion],
}

#[derive(Debug, Serialize)]
struct PromptImageDescription<'a> {
    index: u32,
    description: &'a str,
}

impl<'a> PromptPayload<'a> {
    fn from_request(request: &'a DigestRequest) -> Self {
        let entries = request
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| PromptEntry {
                index,
                emotion: entry.emotion.as_deref(),
                image_descriptions: entry
                    .image_descriptions
                    .iter()
                    .map(|image| PromptImageDescription {
                        index: image.index,
                        description: &image.description,
                    })
                    .collect(),
                overall_day_summary: entry.overall_day_summary.as_deref(),
                questions: &entry.questions,
            })
            .collect();

        Self {
            entries,
            user_locale: request.user_locale.as_deref(),
        }
    }
}

/// JSON reply requested by the digest prompt
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DigestReply {
    title: Option<String>,
    overall_emotion: Option<String>,
    summary: Option<String>,
    ai_insights: Option<InsightsReply>,
    #[serde(default)]
    entry_summaries: Vec<EntrySummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightsReply {
    activity: Option<String>,
    emotion_trend: Option<String>,
    /// A string or an object with a `description`
    special_moment: Option<Value>,
    /// Older replies list several moments
    special_moments: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct EntrySummary {
    index: usize,
    summary: String,
}

impl InsightsReply {
    fn into_insights(self) -> AiInsights {
        let legacy = self
            .special_moments
            .map(|moments| {
                moments
                    .into_iter()
                    .filter_map(|moment| match moment {
                        Value::String(text) => Some(text),
                        Value::Object(mut object) => match object.remove("description") {
                            Some(Value::String(text)) => Some(text),
                            _ => None,
                        },
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|descriptions| !descriptions.is_empty())
            .map(|descriptions| descriptions.join(SPECIAL_MOMENTS_SEPARATOR));

        let special_moment = legacy.or_else(|| match self.special_moment? {
            Value::String(text) => Some(text),
            Value::Object(object) => object
                .get("description")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            _ => None,
        });

        AiInsights {
            activity: self.activity,
            emotion_trend: self.emotion_trend,
            special_moment,
        }
    }
}

/// Builds digests over several diary entries
pub struct DigestService {
    generator: Arc<dyn TextGenerator>,
}

impl DigestService {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DigestHandler for DigestService {
    #[instrument(skip_all, fields(digest_id = %request.id, entries = request.entries.len()))]
    async fn create_digest(&self, request: DigestRequest) -> Result<DigestResponse, ProcessError> {
        let payload = serde_json::to_string(&PromptPayload::from_request(&request)).map_err(
            |source| ProcessError::InvalidRequest {
                channel: Channel::Digest,
                source,
            },
        )?;
        let prompt = PromptRequest::with_system_prompt(PromptType::Digest.system_prompt())
            .user(vec![Part::text(payload)]);

        let reply = self.generator.generate(&prompt).await?;
        let reply: DigestReply = parse_json(&reply)?;

        Ok(assemble(request, reply))
    }
}

fn assemble(request: DigestRequest, reply: DigestReply) -> DigestResponse {
    let period = period(&request.entries);

    let mut summaries = reply
        .entry_summaries
        .into_iter()
        .map(|entry| (entry.index, entry.summary))
        .collect::<HashMap<_, _>>();

    let entries = request
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| EntryDigest {
            summary: summaries.remove(&index).or(entry.overall_day_summary),
            id: entry.id,
        })
        .collect();

    DigestResponse {
        id: request.id,
        period,
        title: reply.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        overall_emotion: reply.overall_emotion,
        summary: reply.summary,
        ai_insights: reply
            .ai_insights
            .map(InsightsReply::into_insights)
            .unwrap_or_default(),
        entries,
    }
}

/// Earliest and latest entry dates; unparseable dates are skipped
fn period(entries: &[DigestEntry]) -> Period {
    let dates = entries
        .iter()
        .filter_map(|entry| entry.date.as_deref())
        .filter(|date| !date.trim().is_empty())
        .filter_map(|date| {
            let parsed = parse_date(date);
            if parsed.is_none() {
                warn!(date, "Skipping unparseable entry date");
            }
            parsed
        })
        .collect::<Vec<_>>();

    match (dates.iter().min(), dates.iter().max()) {
        (Some(start), Some(end)) => Period {
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        },
        _ => Period::default(),
    }
}

/// Calendar date of an RFC 3339 timestamp, naive timestamp or plain date
///
/// Offsets are kept as written, so `2025-03-21T23:30:00-05:00` is March 21st.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if value.contains('T') {
        DateTime::parse_from_rfc3339(value)
            .map(|date| date.date_naive())
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map(|date| date.date()))
            .ok()
            .or_else(|| value.get(..10).and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()))
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::EntryImageDescription;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(id: &str, date: Option<&str>, summary: Option<&str>) -> DigestEntry {
        DigestEntry {
            id: id.to_string(),
            date: date.map(ToString::to_string),
            emotion: Some("happy".to_string()),
            image_descriptions: vec![EntryImageDescription {
                index: 0,
                description: "park".to_string(),
                latitude: Some(37.5),
                longitude: Some(127.0),
            }],
            overall_day_summary: summary.map(ToString::to_string),
            questions: Vec::new(),
        }
    }

    fn request(entries: Vec<DigestEntry>) -> DigestRequest {
        DigestRequest {
            id: "digest-1".to_string(),
            entries,
            user_locale: Some("ko".to_string()),
        }
    }

    fn reply(value: Value) -> DigestReply {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 21);

        assert_eq!(parse_date("2025-03-21T11:05:00+09:00"), day);
        assert_eq!(parse_date("2025-03-21T11:05:00Z"), day);
        assert_eq!(parse_date("2025-03-21T11:05:00"), day);
        assert_eq!(parse_date("2025-03-21T11:05:00.123[Asia/Seoul]"), day);
        assert_eq!(parse_date("2025-03-21"), day);
        assert_eq!(parse_date("21/03/2025"), None);
    }

    #[test]
    fn test_period_spans_entries() {
        let entries = vec![
            entry("b", Some("2025-03-23"), None),
            entry("a", Some("2025-03-21T08:00:00+09:00"), None),
            entry("c", Some("not a date"), None),
            entry("d", None, None),
        ];

        assert_eq!(
            period(&entries),
            Period {
                start: "2025-03-21".to_string(),
                end: "2025-03-23".to_string(),
            }
        );
    }

    #[test]
    fn test_period_without_dates_is_empty() {
        assert_eq!(period(&[entry("a", None, None)]), Period::default());
        assert_eq!(period(&[]), Period::default());
    }

    #[test]
    fn test_prompt_payload_strips_ids_dates_and_coordinates() {
        let request = request(vec![entry("entry-1", Some("2025-03-21"), Some("a walk"))]);

        let payload = serde_json::to_value(PromptPayload::from_request(&request)).unwrap();

        assert_eq!(
            payload,
            json!({
                "entries": [{
                    "index": 0,
                    "emotion": "happy",
                    "imageDescriptions": [{"index": 0, "description": "park"}],
                    "overallDaySummary": "a walk",
                    "questions": []
                }],
                "user_locale": "ko"
            })
        );
    }

    #[test]
    fn test_assemble_full_reply() {
        let request = request(vec![
            entry("e1", Some("2025-03-21"), Some("first day")),
            entry("e2", Some("2025-03-22"), Some("second day")),
        ]);
        let reply = reply(json!({
            "title": "Spring week",
            "overallEmotion": "calm",
            "summary": "A quiet week.",
            "aiInsights": {
                "activity": "walking",
                "emotionTrend": "steady",
                "specialMoment": {"description": "cherry blossoms"}
            },
            "entrySummaries": [{"index": 1, "summary": "rainy"}]
        }));

        let response = assemble(request, reply);

        assert_eq!(response.id, "digest-1");
        assert_eq!(response.title, "Spring week");
        assert_eq!(response.overall_emotion.as_deref(), Some("calm"));
        assert_eq!(
            response.ai_insights,
            AiInsights {
                activity: Some("walking".to_string()),
                emotion_trend: Some("steady".to_string()),
                special_moment: Some("cherry blossoms".to_string()),
            }
        );
        assert_eq!(
            response.entries,
            vec![
                EntryDigest {
                    id: "e1".to_string(),
                    summary: Some("first day".to_string())
                },
                EntryDigest {
                    id: "e2".to_string(),
                    summary: Some("rainy".to_string())
                },
            ]
        );
        assert_eq!(response.period.start, "2025-03-21");
    }

    #[test]
    fn test_assemble_defaults() {
        let response = assemble(request(vec![]), DigestReply::default());

        assert_eq!(response.title, DEFAULT_TITLE);
        assert_eq!(response.ai_insights, AiInsights::default());
        assert!(response.entries.is_empty());
    }

    #[test]
    fn test_special_moment_string() {
        let insights = reply(json!({"aiInsights": {"specialMoment": "first snow"}}))
            .ai_insights
            .unwrap()
            .into_insights();

        assert_eq!(insights.special_moment.as_deref(), Some("first snow"));
    }

    #[test]
    fn test_legacy_special_moments_are_joined() {
        let insights = reply(json!({"aiInsights": {
            "specialMoment": "ignored",
            "specialMoments": [{"description": "a"}, {"title": "no description"}, {"description": "b"}]
        }}))
        .ai_insights
        .unwrap()
        .into_insights();

        assert_eq!(insights.special_moment.as_deref(), Some("a\n\nb"));
    }

    #[test]
    fn test_legacy_special_moments_accept_plain_strings() {
        let insights = reply(json!({"aiInsights": {
            "specialMoments": ["picnic", {"description": "sunset"}, 7]
        }}))
        .ai_insights
        .unwrap()
        .into_insights();

        assert_eq!(insights.special_moment.as_deref(), Some("picnic\n\nsunset"));
    }

    #[test]
    fn test_empty_legacy_moments_fall_back_to_special_moment() {
        let insights = reply(json!({"aiInsights": {
            "specialMoment": {"description": "concert"},
            "specialMoments": [{"title": "untitled"}]
        }}))
        .ai_insights
        .unwrap()
        .into_insights();

        assert_eq!(insights.special_moment.as_deref(), Some("concert"));
    }
}
