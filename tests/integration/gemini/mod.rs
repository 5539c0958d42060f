//! Gemini client integration tests against a wiremock server

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use retouch_common::Error;
use retouch_domain::{MediaKind, OperationKind, OperationRequest};
use retouch_gateway::{
    AnimationEvent, CancelSignal, GatewayError, InlineImage, TransformService,
    VideoOperationHandle,
};

use crate::common::*;

// ============================================================================
// generateContent
// ============================================================================

#[tokio::test]
async fn test_generate_content_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .and(header("x-goog-api-key", TEST_API_KEY))
        .and(body_partial_json(json!({
            "contents": [{"parts": [
                {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode(b"source")}},
                {"text": "make it pop"}
            ]}],
            "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body("image/png", "aGVsbG8=")))
        .expect(1)
        .mount(&server)
        .await;

    let response = gemini_service(&server)
        .generate_image(&InlineImage::encode("image/png", b"source"), "make it pop")
        .await
        .unwrap();

    assert_eq!(response.image.unwrap().decode().unwrap(), b"hello");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn test_filter_success_through_gateway() {
    let server = MockServer::start().await;
    let result_bytes = b"filtered-image";

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_body("image/jpeg", &STANDARD.encode(result_bytes))),
        )
        .mount(&server)
        .await;

    let request =
        OperationRequest::with_instruction(OperationKind::Filter, png(b"source"), "teal and orange")
            .unwrap();
    let artifact = gemini_gateway(&server).transform(&request).await.unwrap();

    assert_eq!(artifact.kind, MediaKind::Image);
    assert_eq!(artifact.mime_type, "image/jpeg");
    assert_eq!(artifact.bytes(), result_bytes);
}

#[tokio::test]
async fn test_blocked_prompt_is_refused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(blocked_body("PROHIBITED_CONTENT")))
        .mount(&server)
        .await;

    let request = OperationRequest::preset(OperationKind::Restore, png(b"source")).unwrap();
    let err = gemini_gateway(&server).transform(&request).await.unwrap_err();

    assert_eq!(
        err,
        Error::Refused {
            reason: "PROHIBITED_CONTENT".to_string(),
            message: Some("The prompt was blocked.".to_string()),
        }
    );
}

#[tokio::test]
async fn test_abnormal_finish_reason_is_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(finish_reason_body("IMAGE_SAFETY")))
        .mount(&server)
        .await;

    let request = OperationRequest::preset(OperationKind::GroupRestore, png(b"source")).unwrap();
    let err = gemini_gateway(&server).transform(&request).await.unwrap_err();

    assert!(matches!(err, Error::Failed(ref detail) if detail.contains("IMAGE_SAFETY")));
}

#[tokio::test]
async fn test_api_error_envelope_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let err = gemini_service(&server)
        .generate_image(&InlineImage::encode("image/png", b"source"), "x")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::Response("Gemini API error (INVALID_ARGUMENT): API key not valid.".to_string())
    );
}

#[tokio::test]
async fn test_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = gemini_service(&server)
        .generate_image(&InlineImage::encode("image/png", b"source"), "x")
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::RateLimit);
}

// ============================================================================
// predictLongRunning
// ============================================================================

#[tokio::test]
async fn test_start_video_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(predict_long_running_path()))
        .and(header("x-goog-api-key", TEST_API_KEY))
        .and(body_partial_json(json!({
            "instances": [{
                "prompt": "waves rolling in",
                "image": {"bytesBase64Encoded": STANDARD.encode(b"source"), "mimeType": "image/png"}
            }],
            "parameters": {"sampleCount": 1}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_operation("operations/op-1")))
        .expect(1)
        .mount(&server)
        .await;

    let handle = gemini_service(&server)
        .start_video(&InlineImage::encode("image/png", b"source"), "waves rolling in")
        .await
        .unwrap();

    assert_eq!(
        handle,
        VideoOperationHandle {
            name: "operations/op-1".to_string()
        }
    );
}

#[tokio::test]
async fn test_animate_polls_then_downloads_with_key() {
    let server = MockServer::start().await;
    let video_uri = format!("{}/files/video-1:download?alt=media", server.uri());

    Mock::given(method("POST"))
        .and(path(predict_long_running_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_operation("operations/op-1")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_operation("operations/op-1")))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(finished_operation("operations/op-1", &video_uri)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/video-1:download"))
        .and(query_param("alt", "media"))
        .and(query_param("key", TEST_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let request =
        OperationRequest::with_instruction(OperationKind::Animate, png(b"source"), "waves")
            .unwrap();
    let events = collect_events(gemini_gateway(&server).animate(request, CancelSignal::never())).await;

    let checkpoints = events
        .iter()
        .filter(|e| matches!(e, AnimationEvent::Progress { message, .. } if message.starts_with("Generating video")))
        .count();
    assert_eq!(checkpoints, 2);

    match events.last() {
        Some(AnimationEvent::Finished(Ok(artifact))) => {
            assert_eq!(artifact.kind, MediaKind::Video);
            assert_eq!(artifact.mime_type, "video/mp4");
            assert_eq!(artifact.bytes(), b"mp4-bytes");
        }
        other => panic!("Expected a video artifact, got {:?}", other),
    }
}

#[tokio::test]
async fn test_animate_operation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(predict_long_running_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_operation("operations/op-2")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/op-2",
            "done": true,
            "error": {"code": 3, "message": "The input image contains a person."}
        })))
        .mount(&server)
        .await;

    let request =
        OperationRequest::with_instruction(OperationKind::Animate, png(b"source"), "waves")
            .unwrap();
    let events = collect_events(gemini_gateway(&server).animate(request, CancelSignal::never())).await;

    assert!(matches!(
        events.last(),
        Some(AnimationEvent::Finished(Err(Error::Failed(detail))))
            if detail.contains("The input image contains a person.")
    ));
}

#[tokio::test]
async fn test_animate_times_out_at_ceiling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(predict_long_running_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_operation("operations/op-3")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_operation("operations/op-3")))
        .expect(u64::from(FAST_POLL.max_attempts))
        .mount(&server)
        .await;

    let request =
        OperationRequest::with_instruction(OperationKind::Animate, png(b"source"), "waves")
            .unwrap();
    let events = collect_events(gemini_gateway(&server).animate(request, CancelSignal::never())).await;

    assert_eq!(
        events.last(),
        Some(&AnimationEvent::Finished(Err(Error::Timeout {
            attempts: FAST_POLL.max_attempts,
            interval_secs: 0,
        })))
    );
}

#[tokio::test]
async fn test_download_failure_reports_status() {
    let server = MockServer::start().await;
    let video_uri = format!("{}/files/video-4", server.uri());

    Mock::given(method("GET"))
        .and(path("/files/video-4"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = gemini_service(&server)
        .download_video(&video_uri)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Response(ref detail) if detail.contains("403")));
}

#[tokio::test]
async fn test_download_connection_failure_omits_api_key() {
    let server = MockServer::start().await;
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let video_uri = format!("http://{}/files/video-5", closed.local_addr().unwrap());
    drop(closed);

    let err = gemini_service(&server)
        .download_video(&video_uri)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Request(_)));
    assert!(!err.to_string().contains(TEST_API_KEY));
    assert!(!Error::from(err).user_message().contains(TEST_API_KEY));
}
