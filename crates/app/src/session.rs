//! Editor session controller
//!
//! Owns the edit history and the transient UI state around it (active tool,
//! hotspot, busy flag, last error) and routes operations through the gateway.
//! `apply` takes `&mut self`, so a session runs at most one operation at a time.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use retouch_common::{Error, Result};
use retouch_domain::{Artifact, History, Hotspot, MediaKind, OperationKind, OperationRequest};
use retouch_gateway::{AnimationEvent, CancelSignal, Gateway};

/// Tool panel currently selected in the editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveTool {
    /// Point edits; the only tool that accepts a hotspot
    #[default]
    Retouch,
    Crop,
    Adjust,
    Filters,
    Restore,
    ThreeDView,
    RemoveBackground,
    Animate,
}

impl ActiveTool {
    /// Tool panel an operation is started from
    pub fn for_operation(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Edit => Self::Retouch,
            OperationKind::Filter => Self::Filters,
            OperationKind::Adjustment => Self::Adjust,
            OperationKind::ThreeDView => Self::ThreeDView,
            OperationKind::BackgroundRemoval => Self::RemoveBackground,
            OperationKind::Restore | OperationKind::GroupRestore => Self::Restore,
            OperationKind::Animate => Self::Animate,
        }
    }
}

/// Read-only view of the session handed out per update
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub active_tool: ActiveTool,
    pub hotspot: Option<Hotspot>,
    pub busy: bool,
    /// Latest advisory progress message of the running operation
    pub progress: Option<String>,
    pub last_error: Option<String>,
    pub current: Option<Artifact>,
    pub head: Option<usize>,
    pub history_len: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Artifact prepared for download
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub artifact: Artifact,
}

impl ExportedArtifact {
    pub fn bytes(&self) -> &[u8] {
        self.artifact.bytes()
    }
}

/// Sink for progress snapshots emitted while an operation runs
pub type SnapshotSender = mpsc::UnboundedSender<SessionSnapshot>;

#[derive(Debug)]
pub struct EditorSession {
    gateway: Gateway,
    history: History,
    active_tool: ActiveTool,
    busy: bool,
    progress: Option<String>,
    last_error: Option<String>,
}

impl EditorSession {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            history: History::new(),
            active_tool: ActiveTool::default(),
            busy: false,
            progress: None,
            last_error: None,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.history.current()
    }

    pub fn active_tool(&self) -> ActiveTool {
        self.active_tool
    }

    pub fn hotspot(&self) -> Option<Hotspot> {
        self.history.hotspot()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_tool: self.active_tool,
            hotspot: self.history.hotspot(),
            busy: self.busy,
            progress: self.progress.clone(),
            last_error: self.last_error.clone(),
            current: self.history.current().cloned(),
            head: self.history.head(),
            history_len: self.history.len(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    /// Replace the whole history with a new upload
    pub fn upload(&mut self, artifact: Artifact) -> Result<()> {
        self.history.upload(artifact)?;
        self.last_error = None;
        self.active_tool = ActiveTool::default();
        if let Some(current) = self.history.current() {
            tracing::info!(artifact = %current.name, kind = %current.kind, size = current.len(), "Artifact uploaded");
        }
        Ok(())
    }

    pub fn upload_path(&mut self, path: &Path) -> Result<()> {
        let artifact = Artifact::from_path(path)?;
        self.upload(artifact)
    }

    /// Append an artifact produced locally, e.g. by the crop tool
    pub fn commit_local_edit(&mut self, artifact: Artifact) -> Result<()> {
        if !artifact.is_image() {
            return Err(Error::InvalidInput(
                "Local edits must produce an image".to_string(),
            ));
        }
        self.history.append(artifact)?;
        self.last_error = None;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tool state
    // -------------------------------------------------------------------------

    /// Switch tool panels; leaving the retouch tool drops the hotspot
    pub fn set_active_tool(&mut self, tool: ActiveTool) {
        if tool != ActiveTool::Retouch {
            self.history.clear_hotspot();
        }
        self.active_tool = tool;
    }

    /// Map a click on the displayed image to a hotspot on the current image
    pub fn select_point(
        &mut self,
        click: (f64, f64),
        displayed: (f64, f64),
        natural: (u32, u32),
    ) -> Result<Hotspot> {
        let hotspot = Hotspot::from_display_click(click, displayed, natural)?;
        self.set_hotspot(hotspot)?;
        Ok(hotspot)
    }

    /// Set a hotspot given in natural pixel coordinates
    pub fn set_hotspot(&mut self, hotspot: Hotspot) -> Result<()> {
        if self.active_tool != ActiveTool::Retouch {
            return Err(Error::InvalidInput(
                "Points can only be selected with the retouch tool".to_string(),
            ));
        }
        match self.history.current() {
            Some(current) if current.is_image() => {}
            Some(_) => {
                return Err(Error::InvalidInput(
                    "Points can only be selected on an image".to_string(),
                ))
            }
            None => {
                return Err(Error::Precondition(
                    "Upload an image before selecting a point".to_string(),
                ))
            }
        }

        self.history.set_hotspot(hotspot)?;
        tracing::debug!(hotspot = %hotspot, "Hotspot selected");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Run an operation against the current artifact and append its result
    pub async fn apply(
        &mut self,
        kind: OperationKind,
        instruction: Option<&str>,
    ) -> Result<Artifact> {
        self.apply_with(kind, instruction, None, CancelSignal::never())
            .await
    }

    /// `apply` with progress snapshots and cancellation
    ///
    /// On failure the history is left unchanged and the user-facing message is
    /// kept as `last_error`.
    pub async fn apply_with(
        &mut self,
        kind: OperationKind,
        instruction: Option<&str>,
        updates: Option<&SnapshotSender>,
        cancel: CancelSignal,
    ) -> Result<Artifact> {
        let request = match self.build_request(kind, instruction) {
            Ok(request) => request,
            Err(e) => return Err(self.record_failure(kind, e)),
        };

        self.active_tool = ActiveTool::for_operation(kind);
        self.busy = true;
        self.progress = None;
        self.last_error = None;
        self.notify(updates);

        let result = if kind.is_long_running() {
            self.run_animation(request, cancel, updates).await
        } else {
            self.gateway.transform_with_cancel(&request, &cancel).await
        };

        self.busy = false;
        self.progress = None;

        let outcome = match result {
            Ok(artifact) => match self.history.append(artifact.clone()) {
                Ok(()) => {
                    tracing::info!(
                        operation = %kind,
                        artifact = %artifact.name,
                        head = ?self.history.head(),
                        "Operation result appended to history"
                    );
                    Ok(artifact)
                }
                Err(e) => Err(self.record_failure(kind, e)),
            },
            Err(e) => Err(self.record_failure(kind, e)),
        };

        self.notify(updates);
        outcome
    }

    async fn run_animation(
        &mut self,
        request: OperationRequest,
        cancel: CancelSignal,
        updates: Option<&SnapshotSender>,
    ) -> Result<Artifact> {
        let stream = self.gateway.animate(request, cancel);
        tokio::pin!(stream);

        while let Some(event) = stream.next().await {
            match event {
                AnimationEvent::Progress { state, message } => {
                    tracing::debug!(state = %state, progress = %message, "Animation progress");
                    self.progress = Some(message);
                    self.notify(updates);
                }
                AnimationEvent::Finished(result) => return result,
            }
        }

        Err(Error::Failed(
            "Video generation ended without a result".to_string(),
        ))
    }

    fn build_request(
        &self,
        kind: OperationKind,
        instruction: Option<&str>,
    ) -> Result<OperationRequest> {
        let source = self.history.current().cloned().ok_or_else(|| {
            Error::InvalidInput("No image loaded to apply the operation to".to_string())
        })?;

        let hotspot = if kind.requires_hotspot() {
            self.history.hotspot()
        } else {
            None
        };
        let instruction = if kind.requires_instruction() {
            instruction.map(str::to_string)
        } else {
            None
        };

        OperationRequest::new(kind, source, instruction, hotspot)
    }

    fn record_failure(&mut self, kind: OperationKind, err: Error) -> Error {
        tracing::warn!(
            operation = %kind,
            error_code = err.error_code(),
            retryable = err.is_retryable(),
            error = %err,
            "Operation failed"
        );
        self.last_error = Some(err.user_message());
        err
    }

    fn notify(&self, updates: Option<&SnapshotSender>) {
        if let Some(tx) = updates {
            // Receiver may be gone; progress is advisory
            let _ = tx.send(self.snapshot());
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<()> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> Result<()> {
        self.history.redo()
    }

    /// Return to the original upload, keeping later entries for redo
    pub fn reset(&mut self) -> Result<()> {
        self.history.reset()
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    pub fn export(&self) -> Result<ExportedArtifact> {
        let artifact = self
            .history
            .current()
            .cloned()
            .ok_or_else(|| Error::Precondition("Nothing to export".to_string()))?;

        Ok(ExportedArtifact {
            file_name: artifact.download_name(),
            mime_type: artifact.mime_type.clone(),
            artifact,
        })
    }

    /// Write the current artifact into `dir` and return the written path
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let exported = self.export()?;

        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Failed(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(&exported.file_name);
        std::fs::write(&path, exported.bytes()).map_err(|e| {
            Error::Failed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        let kind = exported.artifact.kind;
        tracing::info!(path = %path.display(), kind = %kind, size = exported.artifact.len(), "Artifact exported");
        if kind == MediaKind::Video {
            tracing::debug!("Exported the animation; earlier image versions remain in history");
        }
        Ok(path)
    }
}
