//! Editor session workflows end to end

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use retouch_app::EditorSession;
use retouch_common::Error;
use retouch_domain::{MediaKind, OperationKind};
use retouch_gateway::mock::MockVideoOutcome;
use retouch_gateway::{CancelHandle, Gateway};

use crate::common::*;

async fn mount_image(server: &MockServer, instruction_fragment: &str, bytes: &[u8]) {
    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .and(body_string_contains(instruction_fragment))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(image_body("image/png", &STANDARD.encode(bytes))),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_branching_history_against_gemini() {
    let server = MockServer::start().await;
    mount_image(&server, "vintage film", b"B").await;
    mount_image(&server, "brighter shadows", b"C").await;

    let mut session = EditorSession::new(gemini_gateway(&server));
    session.upload(png(b"A")).unwrap();

    session
        .apply(OperationKind::Filter, Some("vintage film"))
        .await
        .unwrap();
    session.undo().unwrap();
    session
        .apply(OperationKind::Adjustment, Some("brighter shadows"))
        .await
        .unwrap();

    let payloads: Vec<&[u8]> = session
        .history()
        .entries()
        .iter()
        .map(|artifact| artifact.bytes())
        .collect();
    assert_eq!(payloads, vec![&b"A"[..], &b"C"[..]]);
    assert!(session.redo().is_err());
    assert_eq!(session.history().head(), Some(1));
}

#[tokio::test]
async fn test_refusal_keeps_history_and_reports_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(blocked_body("SAFETY")))
        .mount(&server)
        .await;

    let mut session = EditorSession::new(gemini_gateway(&server));
    session.upload(png(b"A")).unwrap();

    let err = session
        .apply(OperationKind::Filter, Some("noir"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Refused { .. }));
    assert_eq!(session.history().len(), 1);
    assert!(session.last_error().unwrap().contains("SAFETY"));
}

#[tokio::test]
async fn test_normal_finish_without_image_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_content_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(finish_reason_body("STOP")))
        .mount(&server)
        .await;

    let mut session = EditorSession::new(gemini_gateway(&server));
    session.upload(png(b"A")).unwrap();

    let err = session
        .apply(OperationKind::BackgroundRemoval, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Failed(ref detail) if detail.starts_with("No image was produced")));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_point_edit_sends_hotspot() {
    let server = MockServer::start().await;
    mount_image(&server, "(x: 300, y: 150)", b"edited").await;

    let mut session = EditorSession::new(gemini_gateway(&server));
    session.upload(png(b"A")).unwrap();
    session
        .select_point((150.0, 75.0), (400.0, 200.0), (800, 400))
        .unwrap();

    let artifact = session
        .apply(OperationKind::Edit, Some("remove the bird"))
        .await
        .unwrap();

    assert_eq!(artifact.bytes(), b"edited");
    assert!(session.hotspot().is_none());
}

#[tokio::test]
async fn test_upload_edit_export_roundtrip() {
    let server = MockServer::start().await;
    mount_image(&server, "warmer", b"warm-result").await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("holiday.jpg");
    std::fs::write(&input, b"jpeg-bytes").unwrap();

    let mut session = EditorSession::new(gemini_gateway(&server));
    session.upload_path(&input).unwrap();
    assert_eq!(session.current().unwrap().mime_type, "image/jpeg");

    session
        .apply(OperationKind::Adjustment, Some("warmer"))
        .await
        .unwrap();

    let out_dir = dir.path().join("exports");
    let written = session.export_to_dir(&out_dir).unwrap();

    assert_eq!(written, out_dir.join("retouch-edit.png"));
    assert_eq!(std::fs::read(&written).unwrap(), b"warm-result");
}

#[tokio::test]
async fn test_animation_export_and_further_edits_rejected() {
    let (mut session, _mock) = mock_session(FAST_POLL);

    session
        .apply(OperationKind::Animate, Some("slow pan"))
        .await
        .unwrap();

    let exported = session.export().unwrap();
    assert_eq!(exported.file_name, "retouch-animation.mp4");
    assert_eq!(exported.artifact.kind, MediaKind::Video);

    let err = session
        .apply(OperationKind::Restore, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    session.undo().unwrap();
    assert!(session.current().unwrap().is_image());
}

#[tokio::test]
async fn test_animation_timeout_keeps_history() {
    let (mut session, mock) = mock_session(FAST_POLL);
    mock.behavior()
        .set_video_outcome(MockVideoOutcome::NeverCompletes);

    let err = session
        .apply(OperationKind::Animate, Some("slow pan"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { attempts, .. } if attempts == FAST_POLL.max_attempts));
    assert_eq!(mock.total_polls(), FAST_POLL.max_attempts);
    assert_eq!(session.history().len(), 1);
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn test_cancel_during_animation() {
    let mock = retouch_gateway::mock::MockTransformService::new();
    mock.behavior()
        .set_video_outcome(MockVideoOutcome::NeverCompletes);
    let gateway = Gateway::new(
        Arc::new(mock.clone()),
        retouch_gateway::PollSettings {
            interval: std::time::Duration::from_millis(50),
            max_attempts: 1_000,
        },
    );
    let mut session = EditorSession::new(gateway);
    session.upload(png(b"A")).unwrap();

    let (handle, signal) = CancelHandle::new();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        handle.cancel();
    });

    let err = session
        .apply_with(OperationKind::Animate, Some("slow pan"), None, signal)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err, Error::Cancelled);
    assert!(mock.total_polls() < 1_000);
    assert_eq!(session.history().len(), 1);
    assert!(!session.is_busy());
}
