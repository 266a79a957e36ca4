use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ImageMetadata;

/// Request to analyse the images of a single diary entry
///
/// Producers have used both `imgPars`/`userLocale` and `images`/`user_locale`,
/// so both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diary_id: Option<String>,
    #[serde(default, alias = "user_locale")]
    pub user_locale: Option<String>,
    #[serde(rename = "imgPars", alias = "images")]
    pub images: Vec<ImageRef>,
}

/// Reference to an image that can be downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageRef {
    pub id: String,
    #[serde(rename = "accessUri", alias = "url")]
    pub url: String,
}

/// Result of a diary image analysis, posted to the diary callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisionResponse {
    /// One description per requested image, in request order
    pub images: Vec<ImageDescription>,
    pub overall_day_summary: String,
    pub questions: Vec<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescription {
    pub image_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accepts_img_pars_spelling() {
        let request: VisionRequest = serde_json::from_str(
            r#"{"diaryId":"d-1","userLocale":"en","imgPars":[{"id":"a","accessUri":"https://img/a"}]}"#,
        )
        .unwrap();

        assert_eq!(request.diary_id.as_deref(), Some("d-1"));
        assert_eq!(request.user_locale.as_deref(), Some("en"));
        assert_eq!(request.images[0].url, "https://img/a");
    }

    #[test]
    fn test_accepts_images_spelling() {
        let request: VisionRequest = serde_json::from_str(
            r#"{"images":[{"id":"a","url":"https://img/a"}],"user_locale":"ko"}"#,
        )
        .unwrap();

        assert_eq!(request.diary_id, None);
        assert_eq!(request.user_locale.as_deref(), Some("ko"));
        assert_eq!(
            request.images,
            vec![ImageRef {
                id: "a".to_string(),
                url: "https://img/a".to_string()
            }]
        );
    }

    #[test]
    fn test_response_is_camel_case() {
        let response = VisionResponse {
            images: vec![ImageDescription {
                image_id: "a".to_string(),
                description: "A beach".to_string(),
                metadata: None,
            }],
            overall_day_summary: "ok".to_string(),
            questions: vec![],
            language: "en".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["overallDaySummary"], "ok");
        assert_eq!(json["images"][0]["imageId"], "a");
    }
}
