use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use common_types::{ImageDescription, ImageMetadata, ImageRef, VisionRequest, VisionResponse};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, instrument};

use super::metadata::MetadataProvider;
use crate::dispatch::VisionHandler;
use crate::gemini::{Part, PromptRequest, TextGenerator};
use crate::prompts::PromptType;
use crate::reconcile::{reconcile_with_sections, Reconciled};
use crate::types::ProcessError;

const DEFAULT_LANGUAGE: &str = "ko";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Request timeout for a single image download
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Total time allowed for downloading all images of one request
pub(crate) const DOWNLOAD_BUDGET_SECS: u64 = 60;

struct Placeholders {
    summary: &'static str,
    questions: [&'static str; 3],
    description: &'static str,
}

const KOREAN: Placeholders = Placeholders {
    summary: "오늘 하루의 사진 요약입니다.",
    questions: [
        "이 사진은 어떤 상황인가요?",
        "당시 기분은 어땠나요?",
        "이 순간이 인상 깊었던 이유는?",
    ],
    description: "설명이 제공되지 않았습니다.",
};

const ENGLISH: Placeholders = Placeholders {
    summary: "A summary of today's photos.",
    questions: [
        "What was happening in this photo?",
        "How were you feeling at the time?",
        "What made this moment memorable?",
    ],
    description: "No description was provided.",
};

impl Placeholders {
    fn for_language(language: &str) -> &'static Self {
        if language.to_ascii_lowercase().starts_with("ko") {
            &KOREAN
        } else {
            &ENGLISH
        }
    }
}

/// JSON reply requested by the vision prompt
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisionReply {
    #[serde(default)]
    image_descriptions: Vec<ReplyDescription>,
    #[serde(default)]
    overall_day_summary: Option<String>,
    #[serde(default)]
    questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyDescription {
    Text(String),
    Object { description: String },
}

impl ReplyDescription {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Object { description: text } => text,
        }
    }
}

/// Content recovered from the AI reply, either stage
#[derive(Debug, Default, PartialEq, Eq)]
struct ReplyContent {
    descriptions: Vec<String>,
    summary: String,
    questions: Vec<String>,
}

impl From<Reconciled<VisionReply>> for ReplyContent {
    fn from(reconciled: Reconciled<VisionReply>) -> Self {
        match reconciled {
            Reconciled::Structured(reply) => Self {
                descriptions: reply
                    .image_descriptions
                    .into_iter()
                    .map(ReplyDescription::into_text)
                    .collect(),
                summary: reply.overall_day_summary.unwrap_or_default(),
                questions: reply.questions,
            },
            Reconciled::Sectioned(sections) => Self {
                descriptions: sections.image_descriptions,
                summary: sections.summary,
                questions: sections.questions,
            },
        }
    }
}

struct DownloadedImage {
    bytes: Vec<u8>,
    mime_type: String,
}

/// Describes the photos of one diary day
pub struct VisionService {
    generator: Arc<dyn TextGenerator>,
    metadata: Arc<dyn MetadataProvider>,
    http_client: Client,
    download_budget: Duration,
}

impl VisionService {
    /// Creates a new vision service
    ///
    /// # Panics
    ///
    /// If the HTTP client fails to be created
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, metadata: Arc<dyn MetadataProvider>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            generator,
            metadata,
            http_client,
            download_budget: Duration::from_secs(DOWNLOAD_BUDGET_SECS),
        }
    }

    /// Overrides the total time allowed for downloading the images of a request
    #[must_use]
    pub const fn with_download_budget(mut self, budget: Duration) -> Self {
        self.download_budget = budget;
        self
    }

    async fn download(&self, image: &ImageRef) -> Result<DownloadedImage, ProcessError> {
        let retryable = |reason: String| ProcessError::ImageDownload {
            image_id: image.id.clone(),
            reason,
        };
        let unavailable = |reason: String| ProcessError::ImageUnavailable {
            image_id: image.id.clone(),
            reason,
        };

        let response = self
            .http_client
            .get(&image.url)
            .send()
            .await
            .map_err(|err| {
                if err.is_builder() {
                    unavailable(err.to_string())
                } else {
                    retryable(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = format!("status {status}");
            return Err(if is_retryable_status(status) {
                retryable(reason)
            } else {
                unavailable(reason)
            });
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|err| retryable(err.to_string()))?;
        if bytes.is_empty() {
            return Err(unavailable("empty body".to_string()));
        }

        Ok(DownloadedImage {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

/// Server errors, throttling and request timeouts may clear up on redelivery
fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

#[async_trait]
impl VisionHandler for VisionService {
    #[instrument(skip_all, fields(images = request.images.len()))]
    async fn analyze(&self, request: VisionRequest) -> Result<VisionResponse, ProcessError> {
        let mut prompt = PromptRequest::with_system_prompt(PromptType::Vision.system_prompt());
        let mut metadata = Vec::with_capacity(request.images.len());

        let deadline = Instant::now() + self.download_budget;
        for image in &request.images {
            let downloaded = timeout_at(deadline, self.download(image))
                .await
                .map_err(|_| ProcessError::ImageDownload {
                    image_id: image.id.clone(),
                    reason: "download budget exhausted".to_string(),
                })??;
            let image_metadata = self.metadata.extract(&image.id, &downloaded.bytes).await;

            prompt = prompt.user(vec![
                Part::text(caption(&image_metadata)),
                Part::inline_data(downloaded.mime_type, STANDARD.encode(&downloaded.bytes)),
            ]);
            metadata.push(image_metadata);
        }

        let reply = self.generator.generate(&prompt).await?;
        let content = ReplyContent::from(reconcile_with_sections::<VisionReply>(&reply)?);
        debug!(
            descriptions = content.descriptions.len(),
            questions = content.questions.len(),
            "Reconciled vision reply"
        );

        let language = request
            .user_locale
            .filter(|locale| !locale.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(assemble(&request.images, metadata, content, language))
    }
}

/// Context line placed before each image in the prompt
fn caption(metadata: &ImageMetadata) -> String {
    let time = metadata.capture_date.as_deref().unwrap_or("unknown time");
    let place = metadata
        .location
        .as_ref()
        .and_then(|location| location.address.as_deref())
        .unwrap_or("unknown place");
    let landmarks = metadata
        .nearby_landmarks
        .iter()
        .filter_map(|landmark| landmark.name.as_deref())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    let landmarks = if landmarks.is_empty() {
        "none".to_string()
    } else {
        landmarks.join(", ")
    };

    format!("Captured at {time} in {place}. Landmarks: {landmarks}")
}

/// Builds the response in request order, filling gaps with placeholders
fn assemble(
    images: &[ImageRef],
    metadata: Vec<ImageMetadata>,
    content: ReplyContent,
    language: String,
) -> VisionResponse {
    let placeholders = Placeholders::for_language(&language);
    let mut descriptions = content.descriptions.into_iter();

    let images = images
        .iter()
        .zip(metadata)
        .map(|(image, metadata)| ImageDescription {
            image_id: image.id.clone(),
            description: descriptions
                .next()
                .filter(|description| !description.trim().is_empty())
                .unwrap_or_else(|| placeholders.description.to_string()),
            metadata: (metadata != ImageMetadata::default()).then_some(metadata),
        })
        .collect();

    let overall_day_summary = if content.summary.trim().is_empty() {
        placeholders.summary.to_string()
    } else {
        content.summary
    };

    let questions = if content.questions.is_empty() {
        placeholders.questions.iter().map(ToString::to_string).collect()
    } else {
        content.questions
    };

    VisionResponse {
        images,
        overall_day_summary,
        questions,
        language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::{Landmark, Location};
    use pretty_assertions::assert_eq;

    fn image(id: &str) -> ImageRef {
        ImageRef {
            id: id.to_string(),
            url: format!("http://images/{id}"),
        }
    }

    #[test]
    fn test_structured_reply_overall_summary() {
        let reconciled =
            reconcile_with_sections::<VisionReply>("```json\n{\"overallDaySummary\":\"ok\"}\n```")
                .unwrap();

        let content = ReplyContent::from(reconciled);

        assert_eq!(content.summary, "ok");
        assert!(content.descriptions.is_empty());
    }

    #[test]
    fn test_description_objects_are_accepted() {
        let reconciled = reconcile_with_sections::<VisionReply>(
            r#"{"imageDescriptions":[{"imageId":"a","description":"beach"},"park"]}"#,
        )
        .unwrap();

        let content = ReplyContent::from(reconciled);

        assert_eq!(content.descriptions, vec!["beach".to_string(), "park".to_string()]);
    }

    #[test]
    fn test_assemble_fills_korean_placeholders() {
        let response = assemble(
            &[image("a"), image("b")],
            vec![ImageMetadata::default(), ImageMetadata::default()],
            ReplyContent {
                descriptions: vec!["sunny street".to_string()],
                ..ReplyContent::default()
            },
            "ko".to_string(),
        );

        assert_eq!(response.images[0].description, "sunny street");
        assert_eq!(response.images[1].description, KOREAN.description);
        assert_eq!(response.overall_day_summary, KOREAN.summary);
        assert_eq!(response.questions.len(), 3);
        assert_eq!(response.questions[0], KOREAN.questions[0]);
        assert_eq!(response.language, "ko");
    }

    #[test]
    fn test_assemble_uses_english_placeholders_for_other_locales() {
        let response = assemble(
            &[image("a")],
            vec![ImageMetadata::default()],
            ReplyContent::default(),
            "en-US".to_string(),
        );

        assert_eq!(response.images[0].description, ENGLISH.description);
        assert_eq!(response.overall_day_summary, ENGLISH.summary);
    }

    #[test]
    fn test_assemble_keeps_reply_content_and_metadata() {
        let metadata = ImageMetadata {
            capture_date: Some("2025-03-21T11:05:00+09:00".to_string()),
            location: None,
            nearby_landmarks: Vec::new(),
        };

        let response = assemble(
            &[image("a")],
            vec![metadata.clone()],
            ReplyContent {
                descriptions: vec!["cafe".to_string()],
                summary: "A calm day.".to_string(),
                questions: vec!["Who was there?".to_string()],
            },
            "en".to_string(),
        );

        assert_eq!(response.images[0].metadata, Some(metadata));
        assert_eq!(response.overall_day_summary, "A calm day.");
        assert_eq!(response.questions, vec!["Who was there?".to_string()]);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::GONE));
    }

    #[test]
    fn test_caption() {
        let metadata = ImageMetadata {
            capture_date: Some("2025:03:21 11:05:00".to_string()),
            location: Some(Location {
                latitude: 37.57,
                longitude: 126.98,
                address: Some("Seoul".to_string()),
            }),
            nearby_landmarks: vec![
                Landmark {
                    id: None,
                    name: Some("Gyeongbokgung".to_string()),
                },
                Landmark {
                    id: None,
                    name: Some(String::new()),
                },
            ],
        };

        assert_eq!(
            caption(&metadata),
            "Captured at 2025:03:21 11:05:00 in Seoul. Landmarks: Gyeongbokgung"
        );
        assert_eq!(
            caption(&ImageMetadata::default()),
            "Captured at unknown time in unknown place. Landmarks: none"
        );
    }
}
