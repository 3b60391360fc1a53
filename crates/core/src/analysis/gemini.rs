//! Google Gemini `generateContent` classifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::AnalysisConfig;

use super::classifier::{ClassificationRequest, Classifier, ClassifierError};
use super::types::AnalysisResult;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client.
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Option<Duration>,
}

impl GeminiClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }

    /// Build from config. Fails when no credential is present.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ClassifierError> {
        if !config.is_enabled() {
            return Err(ClassifierError::NotConfigured);
        }

        let mut classifier = Self::new(config.api_key.trim(), config.model.clone());
        if let Some(api_base) = &config.api_base {
            classifier = classifier.with_api_base(api_base.clone());
        }
        if let Some(secs) = config.timeout_secs {
            classifier = classifier.with_timeout(Duration::from_secs(secs));
        }
        Ok(classifier)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Schema the model must answer with. All six fields are requested, though
/// the parser tolerates any of them missing.
fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "pageCount": {
                "type": "INTEGER",
                "description": "Total number of pages in the document. For single images, this should be 1."
            },
            "hasColor": {
                "type": "BOOLEAN",
                "description": "Whether the document or image contains significant color content beyond black and white."
            },
            "imageQuality": {
                "type": "STRING",
                "description": "One-word quality assessment (e.g. 'High', 'Medium', 'Low', 'Blurry'). For documents, assess text clarity."
            },
            "documentType": {
                "type": "STRING",
                "description": "Type of the document based on its content (e.g. 'Invoice', 'Resume', 'Photo', 'Contract', 'Report')."
            },
            "documentContentSummary": {
                "type": "STRING",
                "description": "A brief, one-sentence summary of the main content."
            },
            "fileExtension": {
                "type": "STRING",
                "description": "File extension such as 'PDF', 'JPG', 'PNG'."
            }
        },
        "required": [
            "pageCount",
            "hasColor",
            "imageQuality",
            "documentType",
            "documentContentSummary",
            "fileExtension"
        ]
    })
}

/// Parse the model's text answer.
fn parse_result(text: &str) -> Result<AnalysisResult, ClassifierError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ClassifierError::EmptyResponse);
    }
    serde_json::from_str(trimmed).map_err(|e| ClassifierError::Json(format!("{}: {}", e, trimmed)))
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<AnalysisResult, ClassifierError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: request.instruction.clone(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: request.mime_type.clone(),
                            data: request.base64_data(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: analysis_schema(),
            },
        };

        debug!(
            model = %self.model,
            mime_type = %request.mime_type,
            bytes = request.data.len(),
            "Sending classification request"
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(ClassifierError::Api { status, message });
        }

        let gemini_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport(e))?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or(ClassifierError::EmptyResponse)?;

        parse_result(&text)
    }
}

impl GeminiClassifier {
    fn map_transport(&self, e: reqwest::Error) -> ClassifierError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => ClassifierError::Timeout(timeout),
            _ if e.is_decode() => ClassifierError::Json(e.to_string()),
            _ => ClassifierError::Http(e.to_string()),
        }
    }
}
