//! Gemini REST Implementation
//!
//! Calls the Generative Language API using reqwest:
//! - `models/{model}:generateContent` for synchronous image operations
//! - `models/{model}:predictLongRunning` plus operation polling for video

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    GatewayConfig, GatewayError, ImageResponse, InlineImage, TransformService,
    VideoOperationHandle, VideoOperationStatus,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";

const API_KEY_HEADER: &str = "x-goog-api-key";

// =============================================================================
// generateContent wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

impl From<GenerateContentResponse> for ImageResponse {
    fn from(response: GenerateContentResponse) -> Self {
        let (block_reason, block_reason_message) = response
            .prompt_feedback
            .map(|f| (f.block_reason, f.block_reason_message))
            .unwrap_or((None, None));

        let first = response.candidates.into_iter().next();
        let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());
        let parts = first
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut image = None;
        let mut text = String::new();
        for part in parts {
            if let Some(inline) = part.inline_data {
                if image.is_none() {
                    image = Some(InlineImage::new(inline.mime_type, inline.data));
                }
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }

        ImageResponse {
            block_reason,
            block_reason_message,
            image,
            finish_reason,
            text: if text.is_empty() { None } else { Some(text) },
        }
    }
}

// =============================================================================
// predictLongRunning wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct PredictLongRunningRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    image: VideoImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResult>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: Option<String>,
    code: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

impl From<OperationResponse> for VideoOperationStatus {
    fn from(op: OperationResponse) -> Self {
        let error = op.error.map(|e| match (e.message, e.code) {
            (Some(message), _) => message,
            (None, Some(code)) => format!("Operation failed with code {}", code),
            (None, None) => "Operation failed".to_string(),
        });

        let video_uri = op
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri);

        VideoOperationStatus {
            done: op.done,
            error,
            video_uri,
        }
    }
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

// =============================================================================
// GeminiService
// =============================================================================

/// Gemini transform service implementation
pub struct GeminiService {
    client: Client,
    config: GatewayConfig,
}

impl std::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiService {
    /// Create a new Gemini service
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url(),
            self.config.image_model
        )
    }

    fn predict_long_running_url(&self) -> String {
        format!(
            "{}/models/{}:predictLongRunning",
            self.base_url(),
            self.config.video_model
        )
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url(), name.trim_start_matches('/'))
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("HTTP request failed: {}", e.without_url())))?;

        check_status(response).await
    }
}

/// Append the API key as the `key` query parameter
pub fn authenticated_download_url(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, api_key)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GatewayError::RateLimit);
    }

    if status.is_success() {
        return Ok(response);
    }

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());

    // Try to parse as API error
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_body) {
        return Err(GatewayError::Response(format!(
            "Gemini API error ({}): {}",
            error_response
                .error
                .status
                .unwrap_or_else(|| status.to_string()),
            error_response.error.message
        )));
    }

    Err(GatewayError::Response(format!(
        "Gemini API returned {}: {}",
        status, error_body
    )))
}

#[async_trait::async_trait]
impl TransformService for GeminiService {
    async fn generate_image(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<ImageResponse, GatewayError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart {
                        inline_data: Some(WireInlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.data.clone(),
                        }),
                        text: None,
                    },
                    RequestPart {
                        inline_data: None,
                        text: Some(instruction.to_string()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        };

        tracing::debug!(model = %self.config.image_model, "Sending Gemini generateContent request");

        let response = self.post_json(&self.generate_content_url(), &body).await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Response(format!("Failed to parse response: {}", e.without_url())))?;

        Ok(parsed.into())
    }

    async fn start_video(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<VideoOperationHandle, GatewayError> {
        let body = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: instruction.to_string(),
                image: VideoImage {
                    bytes_base64_encoded: image.data.clone(),
                    mime_type: image.mime_type.clone(),
                },
            }],
            parameters: VideoParameters { sample_count: 1 },
        };

        tracing::debug!(model = %self.config.video_model, "Sending Gemini predictLongRunning request");

        let response = self
            .post_json(&self.predict_long_running_url(), &body)
            .await?;

        let operation: OperationResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Response(format!("Failed to parse operation: {}", e.without_url())))?;

        Ok(VideoOperationHandle {
            name: operation.name,
        })
    }

    async fn video_status(
        &self,
        handle: &VideoOperationHandle,
    ) -> Result<VideoOperationStatus, GatewayError> {
        let response = self
            .client
            .get(self.operation_url(&handle.name))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("HTTP request failed: {}", e.without_url())))?;

        let response = check_status(response).await?;

        let operation: OperationResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Response(format!("Failed to parse operation: {}", e.without_url())))?;

        tracing::debug!(operation = %operation.name, done = operation.done, "Polled video operation");

        Ok(operation.into())
    }

    async fn download_video(&self, uri: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .get(authenticated_download_url(uri, &self.config.api_key))
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("Video download failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Response(format!(
                "Failed to download video: {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Response(format!("Failed to read video body: {}", e.without_url())))?;

        Ok(bytes.to_vec())
    }
}
