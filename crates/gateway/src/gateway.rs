//! Operation dispatch
//!
//! Synchronous kinds are one request classified into an artifact. Animate is a
//! lazily-driven event stream over the initiate/poll/fetch cycle; dropping the
//! stream or firing its `CancelSignal` stops polling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use tokio::sync::watch;

use retouch_common::{Error, Result};
use retouch_domain::{
    Artifact, OperationKind, OperationRequest, VideoJobEvent, VideoJobState, VideoJobStateMachine,
};

use crate::classify::classify_image_response;
use crate::{
    prompts, GatewayConfig, GatewayError, InlineImage, TransformService, TransformServiceFactory,
    VideoOperationStatus,
};

/// Poll bound for long-running operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 30,
        }
    }
}

/// Event emitted by an animation stream
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEvent {
    /// Advisory progress; never carries results
    Progress {
        state: VideoJobState,
        message: String,
    },
    /// Always the last event of the stream
    Finished(Result<Artifact>),
}

impl AnimationEvent {
    fn progress(state: VideoJobState, message: impl Into<String>) -> Self {
        Self::Progress {
            state,
            message: message.into(),
        }
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Fires cancellation for every `CancelSignal` subscribed to it
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, CancelSignal { rx })
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of a `CancelHandle`
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation fires; pending forever if its handle is gone
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless cancellation fires first
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Dispatches operation requests to the transform service
#[derive(Clone)]
pub struct Gateway {
    service: Arc<dyn TransformService>,
    poll: PollSettings,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(service: Arc<dyn TransformService>, poll: PollSettings) -> Self {
        Self { service, poll }
    }

    /// Build the configured provider
    pub fn from_config(config: GatewayConfig) -> std::result::Result<Self, GatewayError> {
        let poll = config.poll_settings();
        let service: Arc<dyn TransformService> = TransformServiceFactory::create(config)?.into();
        Ok(Self::new(service, poll))
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    /// Run a synchronous image operation
    pub async fn transform(&self, request: &OperationRequest) -> Result<Artifact> {
        request.validate()?;
        if request.kind.is_long_running() {
            return Err(Error::InvalidInput(format!(
                "The {} operation is long-running and must be started with animate",
                request.kind
            )));
        }

        let image = InlineImage::from_artifact(&request.source)?;
        let instruction = prompts::instruction_for(request);

        tracing::info!(
            operation = %request.kind,
            source = %request.source.id,
            "Submitting image operation"
        );

        let response = self.service.generate_image(&image, &instruction).await?;
        let artifact = classify_image_response(request.kind, response)?;

        tracing::info!(operation = %request.kind, artifact = %artifact.name, "Image operation succeeded");
        Ok(artifact)
    }

    /// Run a synchronous image operation unless `cancel` fires first
    pub async fn transform_with_cancel(
        &self,
        request: &OperationRequest,
        cancel: &CancelSignal,
    ) -> Result<Artifact> {
        cancel
            .run(self.transform(request))
            .await
            .unwrap_or(Err(Error::Cancelled))
    }

    /// Start an image-to-video generation
    ///
    /// The returned stream yields `Progress` events and ends with exactly one
    /// `Finished`. Nothing is sent until the stream is first polled.
    pub fn animate(
        &self,
        request: OperationRequest,
        cancel: CancelSignal,
    ) -> impl Stream<Item = AnimationEvent> + Send + 'static {
        let service = Arc::clone(&self.service);
        let poll = self.poll;

        async_stream::stream! {
            let image = match prepare_animation(&request) {
                Ok(image) => image,
                Err(e) => {
                    yield AnimationEvent::Finished(Err(e));
                    return;
                }
            };
            let instruction = prompts::instruction_for(&request);

            let mut state = VideoJobState::Initiating;
            yield AnimationEvent::progress(state, "Initializing video generation...");

            let result: Result<Artifact> = 'job: {
                let handle = match cancel.run(service.start_video(&image, &instruction)).await {
                    None => break 'job Err(Error::Cancelled),
                    Some(Err(e)) => {
                        state = advance(state, VideoJobEvent::SubmitFailed);
                        break 'job Err(e.into());
                    }
                    Some(Ok(handle)) => handle,
                };

                tracing::info!(operation = %handle.name, "Video generation submitted");
                state = advance(state, VideoJobEvent::Submitted);
                yield AnimationEvent::progress(state, "Submitted request, waiting for the model...");

                let mut status = VideoOperationStatus::default();
                let mut attempts: u32 = 0;

                while !status.done && attempts < poll.max_attempts {
                    if cancel.run(tokio::time::sleep(poll.interval)).await.is_none() {
                        break 'job Err(Error::Cancelled);
                    }

                    status = match cancel.run(service.video_status(&handle)).await {
                        None => break 'job Err(Error::Cancelled),
                        Some(Err(e)) => {
                            state = advance(state, VideoJobEvent::OperationFailed);
                            break 'job Err(e.into());
                        }
                        Some(Ok(status)) => status,
                    };
                    attempts += 1;

                    if !status.done {
                        state = advance(state, VideoJobEvent::StillRunning);
                        let elapsed = (poll.interval * attempts).as_secs();
                        yield AnimationEvent::progress(
                            state,
                            format!("Generating video... ({}s elapsed)", elapsed),
                        );
                    }
                }

                if !status.done {
                    state = advance(state, VideoJobEvent::CeilingReached);
                    break 'job Err(Error::Timeout {
                        attempts,
                        interval_secs: poll.interval.as_secs(),
                    });
                }

                if let Some(message) = status.error {
                    state = advance(state, VideoJobEvent::OperationFailed);
                    break 'job Err(Error::Failed(format!("Video generation failed: {}", message)));
                }

                state = advance(state, VideoJobEvent::Done);
                let Some(uri) = status.video_uri else {
                    state = advance(state, VideoJobEvent::NoOutput);
                    break 'job Err(Error::Failed(
                        "Video generation completed, but no output was returned".to_string(),
                    ));
                };

                state = advance(state, VideoJobEvent::StartDownload);
                yield AnimationEvent::progress(state, "Downloading generated video...");

                let bytes = match cancel.run(service.download_video(&uri)).await {
                    None => break 'job Err(Error::Cancelled),
                    Some(Err(e)) => {
                        state = advance(state, VideoJobEvent::DownloadError);
                        break 'job Err(Error::Failed(format!(
                            "Failed to download the generated video: {}",
                            e
                        )));
                    }
                    Some(Ok(bytes)) => bytes,
                };

                match Artifact::generated_video(OperationKind::Animate.artifact_label(), bytes) {
                    Ok(artifact) => {
                        state = advance(state, VideoJobEvent::Downloaded);
                        Ok(artifact)
                    }
                    Err(_) => {
                        state = advance(state, VideoJobEvent::DownloadError);
                        Err(Error::Failed("The downloaded video is empty".to_string()))
                    }
                }
            };

            if matches!(result, Err(Error::Cancelled)) {
                state = advance(state, VideoJobEvent::Cancel);
            }

            match &result {
                Ok(artifact) => {
                    tracing::info!(state = %state, artifact = %artifact.name, "Video generation succeeded")
                }
                Err(e) => {
                    tracing::warn!(state = %state, error_code = e.error_code(), error = %e, "Video generation ended without output")
                }
            }

            yield AnimationEvent::Finished(result);
        }
    }
}

fn prepare_animation(request: &OperationRequest) -> Result<InlineImage> {
    request.validate()?;
    if request.kind != OperationKind::Animate {
        return Err(Error::InvalidInput(format!(
            "The {} operation does not produce a video",
            request.kind
        )));
    }
    InlineImage::from_artifact(&request.source)
}

/// Apply a job event, falling back to `Errored` on an invalid transition
fn advance(state: VideoJobState, event: VideoJobEvent) -> VideoJobState {
    match VideoJobStateMachine::transition(state, event.clone()) {
        Ok(next) => {
            tracing::debug!(from = %state, event = %event, to = %next, "Video job transition");
            next
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid video job transition");
            VideoJobState::Errored
        }
    }
}
