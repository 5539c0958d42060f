//! Mock Transform Service Implementation
//!
//! Programmable mock for testing edit and animation workflows:
//! - `MockTransformService`: configurable mock with call recording
//! - `MockBehavior`: controls image outcome, video outcome, poll count
//! - `MockImageOutcome` / `MockVideoOutcome`: what the service answers

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::{
    GatewayError, ImageResponse, InlineImage, TransformService, VideoOperationHandle,
    VideoOperationStatus,
};

/// Bytes returned for generated images unless overridden
pub const DEFAULT_IMAGE_BYTES: &[u8] = b"mock-image-bytes";
/// Bytes returned for generated videos unless overridden
pub const DEFAULT_VIDEO_BYTES: &[u8] = b"mock-video-bytes";

const MOCK_VIDEO_URI: &str = "mock://videos/generated.mp4";

/// What the mock answers to a synchronous image request
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MockImageOutcome {
    /// Return an inline image with a normal finish
    #[default]
    Image,
    /// Block the request with the given reason
    Blocked(String),
    /// No image, abnormal finish reason
    FinishReason(String),
    /// No image, text only
    TextOnly(String),
    /// No image, no text, normal finish
    Empty,
    /// Transport failure
    TransportError(String),
}

/// How the mock's long-running video generation ends
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MockVideoOutcome {
    /// Done with a downloadable video
    #[default]
    Complete,
    /// Never reports done
    NeverCompletes,
    /// Done with an error message
    OperationError(String),
    /// Done without any generated sample
    NoOutput,
    /// Done, but the download fails
    DownloadFailure,
    /// Submission itself is rejected
    SubmitFailure(String),
}

/// Programmable behavior for the mock transform service
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub image_outcome: Arc<RwLock<MockImageOutcome>>,
    pub video_outcome: Arc<RwLock<MockVideoOutcome>>,
    /// Status queries answered "not done" before completion
    pub polls_until_done: Arc<RwLock<u32>>,
    pub image_bytes: Arc<RwLock<Vec<u8>>>,
    pub video_bytes: Arc<RwLock<Vec<u8>>>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            image_outcome: Arc::new(RwLock::new(MockImageOutcome::Image)),
            video_outcome: Arc::new(RwLock::new(MockVideoOutcome::Complete)),
            polls_until_done: Arc::new(RwLock::new(0)),
            image_bytes: Arc::new(RwLock::new(DEFAULT_IMAGE_BYTES.to_vec())),
            video_bytes: Arc::new(RwLock::new(DEFAULT_VIDEO_BYTES.to_vec())),
        }
    }
}

impl MockBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_image_outcome(&self, outcome: MockImageOutcome) {
        *self.image_outcome.write().unwrap() = outcome;
    }

    pub fn set_video_outcome(&self, outcome: MockVideoOutcome) {
        *self.video_outcome.write().unwrap() = outcome;
    }

    /// Number of "still running" answers before the operation is done
    pub fn set_polls_until_done(&self, polls: u32) {
        *self.polls_until_done.write().unwrap() = polls;
    }

    pub fn set_image_bytes(&self, bytes: impl Into<Vec<u8>>) {
        *self.image_bytes.write().unwrap() = bytes.into();
    }

    pub fn set_video_bytes(&self, bytes: impl Into<Vec<u8>>) {
        *self.video_bytes.write().unwrap() = bytes.into();
    }

    /// Reset to default behavior
    pub fn reset(&self) {
        *self.image_outcome.write().unwrap() = MockImageOutcome::Image;
        *self.video_outcome.write().unwrap() = MockVideoOutcome::Complete;
        *self.polls_until_done.write().unwrap() = 0;
        *self.image_bytes.write().unwrap() = DEFAULT_IMAGE_BYTES.to_vec();
        *self.video_bytes.write().unwrap() = DEFAULT_VIDEO_BYTES.to_vec();
    }

    pub fn get_image_outcome(&self) -> MockImageOutcome {
        self.image_outcome.read().unwrap().clone()
    }

    pub fn get_video_outcome(&self) -> MockVideoOutcome {
        self.video_outcome.read().unwrap().clone()
    }
}

/// A recorded service call for test assertions
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    GenerateImage { mime_type: String, instruction: String },
    StartVideo { mime_type: String, instruction: String },
    VideoStatus { name: String },
    DownloadVideo { uri: String },
}

/// Mock transform service with programmable behavior
#[derive(Debug, Clone)]
pub struct MockTransformService {
    behavior: Arc<MockBehavior>,
    history: Arc<Mutex<Vec<RecordedCall>>>,
    polls: Arc<Mutex<HashMap<String, u32>>>,
    next_operation: Arc<Mutex<u32>>,
}

impl Default for MockTransformService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransformService {
    pub fn new() -> Self {
        Self::with_behavior(Arc::new(MockBehavior::new()))
    }

    pub fn with_behavior(behavior: Arc<MockBehavior>) -> Self {
        Self {
            behavior,
            history: Arc::new(Mutex::new(Vec::new())),
            polls: Arc::new(Mutex::new(HashMap::new())),
            next_operation: Arc::new(Mutex::new(0)),
        }
    }

    /// Get the shared behavior for external configuration
    pub fn behavior(&self) -> &Arc<MockBehavior> {
        &self.behavior
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.history.lock().unwrap().clone()
    }

    /// Number of status queries made for an operation
    pub fn poll_count(&self, name: &str) -> u32 {
        self.polls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Total number of status queries across operations
    pub fn total_polls(&self) -> u32 {
        self.polls.lock().unwrap().values().sum()
    }

    /// Clear history
    pub fn reset_history(&self) {
        self.history.lock().unwrap().clear();
        self.polls.lock().unwrap().clear();
    }

    fn record(&self, call: RecordedCall) {
        self.history.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl TransformService for MockTransformService {
    async fn generate_image(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<ImageResponse, GatewayError> {
        tracing::info!(mime_type = %image.mime_type, "Mock transform: received image request");

        self.record(RecordedCall::GenerateImage {
            mime_type: image.mime_type.clone(),
            instruction: instruction.to_string(),
        });

        let response = match self.behavior.get_image_outcome() {
            MockImageOutcome::Image => {
                let bytes = self.behavior.image_bytes.read().unwrap().clone();
                ImageResponse {
                    image: Some(InlineImage::encode("image/png", &bytes)),
                    finish_reason: Some("STOP".to_string()),
                    ..Default::default()
                }
            }
            MockImageOutcome::Blocked(reason) => ImageResponse {
                block_reason: Some(reason),
                block_reason_message: Some("Blocked by mock policy".to_string()),
                ..Default::default()
            },
            MockImageOutcome::FinishReason(reason) => ImageResponse {
                finish_reason: Some(reason),
                ..Default::default()
            },
            MockImageOutcome::TextOnly(text) => ImageResponse {
                finish_reason: Some("STOP".to_string()),
                text: Some(text),
                ..Default::default()
            },
            MockImageOutcome::Empty => ImageResponse {
                finish_reason: Some("STOP".to_string()),
                ..Default::default()
            },
            MockImageOutcome::TransportError(message) => {
                return Err(GatewayError::Request(message));
            }
        };

        Ok(response)
    }

    async fn start_video(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<VideoOperationHandle, GatewayError> {
        self.record(RecordedCall::StartVideo {
            mime_type: image.mime_type.clone(),
            instruction: instruction.to_string(),
        });

        if let MockVideoOutcome::SubmitFailure(message) = self.behavior.get_video_outcome() {
            return Err(GatewayError::Response(message));
        }

        let name = {
            let mut next = self.next_operation.lock().unwrap();
            *next += 1;
            format!("operations/mock-{}", next)
        };

        tracing::info!(operation = %name, "Mock transform: started video operation");

        Ok(VideoOperationHandle { name })
    }

    async fn video_status(
        &self,
        handle: &VideoOperationHandle,
    ) -> Result<VideoOperationStatus, GatewayError> {
        self.record(RecordedCall::VideoStatus {
            name: handle.name.clone(),
        });

        let count = {
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(handle.name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let polls_until_done = *self.behavior.polls_until_done.read().unwrap();
        let outcome = self.behavior.get_video_outcome();

        if outcome == MockVideoOutcome::NeverCompletes || count <= polls_until_done {
            return Ok(VideoOperationStatus::default());
        }

        let status = match outcome {
            MockVideoOutcome::OperationError(message) => VideoOperationStatus {
                done: true,
                error: Some(message),
                video_uri: None,
            },
            MockVideoOutcome::NoOutput => VideoOperationStatus {
                done: true,
                ..Default::default()
            },
            _ => VideoOperationStatus {
                done: true,
                error: None,
                video_uri: Some(MOCK_VIDEO_URI.to_string()),
            },
        };

        Ok(status)
    }

    async fn download_video(&self, uri: &str) -> Result<Vec<u8>, GatewayError> {
        self.record(RecordedCall::DownloadVideo {
            uri: uri.to_string(),
        });

        if self.behavior.get_video_outcome() == MockVideoOutcome::DownloadFailure {
            return Err(GatewayError::Response(
                "Failed to download video: 403 Forbidden".to_string(),
            ));
        }

        Ok(self.behavior.video_bytes.read().unwrap().clone())
    }
}
