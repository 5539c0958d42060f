//! Artifacts: the immutable media blobs held in edit history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use retouch_common::{Error, Result};

/// Media kind of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

impl MediaKind {
    /// Infer the media kind and MIME type from a file extension
    pub fn from_extension(ext: &str) -> Option<(MediaKind, &'static str)> {
        let kind = match ext.to_ascii_lowercase().as_str() {
            "png" => (MediaKind::Image, "image/png"),
            "jpg" | "jpeg" => (MediaKind::Image, "image/jpeg"),
            "webp" => (MediaKind::Image, "image/webp"),
            "gif" => (MediaKind::Image, "image/gif"),
            "heic" => (MediaKind::Image, "image/heic"),
            "mp4" => (MediaKind::Video, "video/mp4"),
            "webm" => (MediaKind::Video, "video/webm"),
            "mov" => (MediaKind::Video, "video/quicktime"),
            _ => return None,
        };
        Some(kind)
    }
}

/// Immutable media blob plus metadata.
///
/// Cloning is cheap: the payload is shared, never copied or mutated.
#[derive(Clone, PartialEq)]
pub struct Artifact {
    pub id: Uuid,
    pub name: String,
    pub kind: MediaKind,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    bytes: Arc<[u8]>,
}

impl std::fmt::Debug for Artifact {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Artifact {
    /// Create a new artifact with validation
    pub fn new(
        kind: MediaKind,
        mime_type: impl Into<String>,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidInput("Artifact payload is empty".to_string()));
        }

        let mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            return Err(Error::InvalidInput("Artifact MIME type is empty".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            mime_type,
            created_at: Utc::now(),
            bytes,
        })
    }

    /// Image artifact named after the operation that produced it
    pub fn generated_image(
        label: &str,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        let mime_type = mime_type.into();
        let name = format!(
            "{}-{}.{}",
            label,
            Utc::now().timestamp_millis(),
            extension_for_mime(&mime_type)
        );
        Self::new(MediaKind::Image, mime_type, name, bytes)
    }

    /// Video artifact named after the operation that produced it
    pub fn generated_video(label: &str, bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let name = format!("{}-{}.mp4", label, Utc::now().timestamp_millis());
        Self::new(MediaKind::Video, "video/mp4", name, bytes)
    }

    /// Read a local file as a seed artifact
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let (kind, mime_type) = MediaKind::from_extension(ext).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unsupported file type: {}",
                path.display()
            ))
        })?;

        let bytes = std::fs::read(path).map_err(|e| {
            Error::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        tracing::debug!(name = %name, kind = %kind, size = bytes.len(), "Loaded artifact from disk");

        Self::new(kind, mime_type, name, bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }

    /// Download name reflecting the media kind
    pub fn download_name(&self) -> String {
        match self.kind {
            MediaKind::Image => format!("retouch-edit.{}", self.extension()),
            MediaKind::Video => format!("retouch-animation.{}", self.extension()),
        }
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ if mime_type.starts_with("video/") => "mp4",
        _ => "png",
    }
}
