//! Inline image payloads (MIME type plus base64 data)

use base64::{engine::general_purpose::STANDARD, Engine};

use retouch_common::{Error, Result};
use retouch_domain::{Artifact, OperationKind};

/// Image bytes encoded for embedding in a JSON request or response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn encode(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Encode an image artifact for submission
    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        if !artifact.is_image() {
            return Err(Error::InvalidInput(format!(
                "Only images can be sent to the transform service, got {}",
                artifact.kind
            )));
        }
        Ok(Self::encode(artifact.mime_type.clone(), artifact.bytes()))
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.trim())
            .map_err(|e| Error::Failed(format!("Service returned an invalid image payload: {}", e)))
    }

    /// Decode into a new image artifact named after the producing operation
    pub fn into_artifact(self, kind: OperationKind) -> Result<Artifact> {
        let bytes = self.decode()?;
        let mime_type = if self.mime_type.is_empty() {
            "image/png".to_string()
        } else {
            self.mime_type
        };
        Artifact::generated_image(kind.artifact_label(), mime_type, bytes)
            .map_err(|_| Error::Failed("Service returned an empty image".to_string()))
    }
}
