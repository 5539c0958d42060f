//! Retouch Remote Operation Gateway
//!
//! Adapter between the edit history and a hosted image/video transformation service:
//! - Gemini REST integration for production (`gemini`)
//! - Programmable mock service for testing and development (`mock`)
//! - Response classification into success, refusal, or failure
//! - Bounded initiate/poll/fetch driver for image-to-video generation

pub mod classify;
pub mod gateway;
pub mod gemini;
pub mod mock;
pub mod payload;
pub mod prompts;

use std::time::Duration;

use thiserror::Error;

pub use gateway::{AnimationEvent, CancelHandle, CancelSignal, Gateway, PollSettings};
pub use payload::InlineImage;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Gateway configuration error: {0}")]
    Configuration(String),

    #[error("Gateway request error: {0}")]
    Request(String),

    #[error("Gateway response error: {0}")]
    Response(String),

    #[error("Rate limit exceeded, try again shortly")]
    RateLimit,
}

impl From<GatewayError> for retouch_common::Error {
    fn from(err: GatewayError) -> Self {
        retouch_common::Error::Failed(err.to_string())
    }
}

/// Raw, unclassified result of a synchronous image request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageResponse {
    /// Set when the service blocked the request itself
    pub block_reason: Option<String>,
    pub block_reason_message: Option<String>,
    /// First inline image payload of the first candidate
    pub image: Option<InlineImage>,
    /// Completion reason of the first candidate
    pub finish_reason: Option<String>,
    /// Text parts of the first candidate, concatenated
    pub text: Option<String>,
}

/// Handle to a long-running video generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOperationHandle {
    pub name: String,
}

/// Snapshot of a long-running video generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoOperationStatus {
    pub done: bool,
    /// Error message reported by the service
    pub error: Option<String>,
    /// Download reference of the first generated sample
    pub video_uri: Option<String>,
}

/// Gateway configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// Transform provider (gemini, mock)
    pub provider: String,
    /// API key for the hosted service
    pub api_key: String,
    /// Base URL of the REST API
    pub base_url: String,
    pub image_model: String,
    pub video_model: String,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("image_model", &self.image_model)
            .field("video_model", &self.video_model)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            api_key: String::new(),
            base_url: gemini::DEFAULT_BASE_URL.to_string(),
            image_model: gemini::DEFAULT_IMAGE_MODEL.to_string(),
            video_model: gemini::DEFAULT_VIDEO_MODEL.to_string(),
            poll_interval_secs: 10,
            max_poll_attempts: 30,
            request_timeout_secs: 120,
        }
    }
}

impl GatewayConfig {
    /// Create gateway config from environment variables
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let provider = std::env::var("TRANSFORM_PROVIDER").unwrap_or(defaults.provider);
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();

        if provider == "gemini" && api_key.is_empty() {
            return Err(GatewayError::Configuration(
                "GEMINI_API_KEY is required for the gemini provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            image_model: std::env::var("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            video_model: std::env::var("GEMINI_VIDEO_MODEL").unwrap_or(defaults.video_model),
            poll_interval_secs: env_number("VIDEO_POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
            max_poll_attempts: env_number("VIDEO_MAX_POLL_ATTEMPTS", defaults.max_poll_attempts)?,
            request_timeout_secs: env_number(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
        })
    }

    /// Poll bound for the animate operation
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts,
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, GatewayError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            GatewayError::Configuration(format!("{} must be a non-negative integer, got {:?}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Transport-level contract of the hosted transformation service
#[async_trait::async_trait]
pub trait TransformService: Send + Sync {
    /// Submit one image plus instruction and return the raw response
    async fn generate_image(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<ImageResponse, GatewayError>;

    /// Start an image-to-video generation
    async fn start_video(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<VideoOperationHandle, GatewayError>;

    /// Query a running video generation
    async fn video_status(
        &self,
        handle: &VideoOperationHandle,
    ) -> Result<VideoOperationStatus, GatewayError>;

    /// Fetch generated video bytes (authenticated)
    async fn download_video(&self, uri: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Factory for creating TransformService implementations
pub struct TransformServiceFactory;

impl TransformServiceFactory {
    pub fn create(config: GatewayConfig) -> Result<Box<dyn TransformService>, GatewayError> {
        match config.provider.as_str() {
            "gemini" => {
                tracing::info!("Creating Gemini transform service");
                if config.api_key.is_empty() {
                    return Err(GatewayError::Configuration(
                        "GEMINI_API_KEY is required for the gemini provider".to_string(),
                    ));
                }
                Ok(Box::new(gemini::GeminiService::new(config)?))
            }
            "mock" => {
                tracing::info!("Creating mock transform service");
                Ok(Box::new(mock::MockTransformService::new()))
            }
            provider => Err(GatewayError::Configuration(format!(
                "Unknown transform provider: {}. Supported providers: gemini, mock",
                provider
            ))),
        }
    }
}
