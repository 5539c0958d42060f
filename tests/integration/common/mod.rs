//! Common test utilities and fixtures for integration tests
//!
//! - Gemini service wired to a wiremock server
//! - Canned Gemini response bodies
//! - Artifact and session fixtures

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_stream::{Stream, StreamExt};
use wiremock::MockServer;

use retouch_app::EditorSession;
use retouch_domain::{Artifact, MediaKind};
use retouch_gateway::gemini::GeminiService;
use retouch_gateway::mock::MockTransformService;
use retouch_gateway::{AnimationEvent, Gateway, GatewayConfig, PollSettings};

pub const TEST_API_KEY: &str = "test-api-key";
pub const IMAGE_MODEL: &str = "test-image-model";
pub const VIDEO_MODEL: &str = "test-video-model";

/// Poll bound short enough for real-time tests
pub const FAST_POLL: PollSettings = PollSettings {
    interval: Duration::from_millis(10),
    max_attempts: 5,
};

pub fn gemini_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        provider: "gemini".to_string(),
        api_key: TEST_API_KEY.to_string(),
        base_url: server.uri(),
        image_model: IMAGE_MODEL.to_string(),
        video_model: VIDEO_MODEL.to_string(),
        request_timeout_secs: 5,
        ..GatewayConfig::default()
    }
}

pub fn gemini_service(server: &MockServer) -> GeminiService {
    GeminiService::new(gemini_config(server)).expect("client should build")
}

pub fn gemini_gateway(server: &MockServer) -> Gateway {
    Gateway::new(Arc::new(gemini_service(server)), FAST_POLL)
}

pub fn generate_content_path() -> String {
    format!("/models/{}:generateContent", IMAGE_MODEL)
}

pub fn predict_long_running_path() -> String {
    format!("/models/{}:predictLongRunning", VIDEO_MODEL)
}

pub fn png(bytes: &[u8]) -> Artifact {
    Artifact::new(MediaKind::Image, "image/png", "photo.png", bytes.to_vec()).unwrap()
}

/// generateContent body with one inline image
pub fn image_body(mime_type: &str, base64_data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": mime_type, "data": base64_data}}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn blocked_body(reason: &str) -> Value {
    json!({"promptFeedback": {"blockReason": reason, "blockReasonMessage": "The prompt was blocked."}})
}

pub fn finish_reason_body(reason: &str) -> Value {
    json!({"candidates": [{"content": {"parts": []}, "finishReason": reason}]})
}

pub fn running_operation(name: &str) -> Value {
    json!({"name": name, "done": false})
}

pub fn finished_operation(name: &str, uri: &str) -> Value {
    json!({
        "name": name,
        "done": true,
        "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": uri}}]}}
    })
}

/// Session over a fresh mock service, seeded with one image
pub fn mock_session(poll: PollSettings) -> (EditorSession, MockTransformService) {
    let mock = MockTransformService::new();
    let gateway = Gateway::new(Arc::new(mock.clone()), poll);
    let mut session = EditorSession::new(gateway);
    session.upload(png(b"original")).unwrap();
    (session, mock)
}

pub async fn collect_events(stream: impl Stream<Item = AnimationEvent>) -> Vec<AnimationEvent> {
    tokio::pin!(stream);
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}
