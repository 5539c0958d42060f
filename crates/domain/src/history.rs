//! Linear edit history
//!
//! An ordered version log of artifacts with a single cursor:
//! - `entries[0]` is the original upload and survives undo/redo
//! - appending discards the redo branch (no tree history)
//! - the transient hotspot is cleared whenever the head moves

use retouch_common::{Error, Result};

use crate::artifact::Artifact;
use crate::hotspot::Hotspot;

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Artifact>,
    head: Option<usize>,
    hotspot: Option<Hotspot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole history with a single seed artifact
    pub fn upload(&mut self, artifact: Artifact) -> Result<()> {
        if artifact.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot upload an empty artifact".to_string(),
            ));
        }

        self.entries.clear();
        self.entries.push(artifact);
        self.head = Some(0);
        self.hotspot = None;

        tracing::debug!("History reset with new upload");
        Ok(())
    }

    /// Push a new artifact after the head, discarding any redo branch
    pub fn append(&mut self, artifact: Artifact) -> Result<()> {
        let head = self.head.ok_or_else(|| {
            Error::Precondition("Cannot append before an image is uploaded".to_string())
        })?;

        let discarded = self.entries.len() - (head + 1);
        self.entries.truncate(head + 1);
        self.entries.push(artifact);
        self.head = Some(self.entries.len() - 1);
        self.hotspot = None;

        tracing::debug!(
            head = self.entries.len() - 1,
            discarded = discarded,
            "Appended artifact to history"
        );
        Ok(())
    }

    pub fn undo(&mut self) -> Result<()> {
        match self.head {
            Some(head) if head > 0 => {
                self.head = Some(head - 1);
                self.hotspot = None;
                Ok(())
            }
            _ => Err(Error::Precondition("Nothing to undo".to_string())),
        }
    }

    pub fn redo(&mut self) -> Result<()> {
        match self.head {
            Some(head) if head + 1 < self.entries.len() => {
                self.head = Some(head + 1);
                self.hotspot = None;
                Ok(())
            }
            _ => Err(Error::Precondition("Nothing to redo".to_string())),
        }
    }

    /// Move the head back to the original upload without dropping entries
    pub fn reset(&mut self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::Precondition("History is empty".to_string()));
        }

        self.head = Some(0);
        self.hotspot = None;
        Ok(())
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.head.and_then(|head| self.entries.get(head))
    }

    pub fn original(&self) -> Option<&Artifact> {
        self.entries.first()
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.head, Some(head) if head > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.head, Some(head) if head + 1 < self.entries.len())
    }

    /// Cursor position; `None` when the history is empty
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    /// Mark the focus of the next point edit on the current image
    pub fn set_hotspot(&mut self, hotspot: Hotspot) -> Result<()> {
        if self.head.is_none() {
            return Err(Error::Precondition(
                "Cannot place a hotspot before an image is uploaded".to_string(),
            ));
        }
        self.hotspot = Some(hotspot);
        Ok(())
    }

    pub fn clear_hotspot(&mut self) {
        self.hotspot = None;
    }

    pub fn hotspot(&self) -> Option<Hotspot> {
        self.hotspot
    }
}
