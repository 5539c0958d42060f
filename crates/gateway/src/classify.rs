//! Response classification for synchronous image operations
//!
//! Priority order:
//! 1. blocked request -> `Refused`
//! 2. inline image -> new image artifact
//! 3. abnormal finish reason -> `Failed`
//! 4. anything else -> `Failed` with the returned text or a generic message

use retouch_common::{Error, Result};
use retouch_domain::{Artifact, OperationKind};

use crate::ImageResponse;

/// Completion reason reported for a normal finish
pub const NORMAL_FINISH_REASON: &str = "STOP";

pub fn classify_image_response(kind: OperationKind, response: ImageResponse) -> Result<Artifact> {
    if let Some(reason) = response.block_reason {
        tracing::warn!(operation = %kind, reason = %reason, "Request blocked by service");
        return Err(Error::Refused {
            reason,
            message: response.block_reason_message,
        });
    }

    if let Some(image) = response.image {
        return image.into_artifact(kind);
    }

    if let Some(reason) = response
        .finish_reason
        .filter(|reason| reason != NORMAL_FINISH_REASON)
    {
        tracing::warn!(operation = %kind, finish_reason = %reason, "Generation stopped unexpectedly");
        return Err(Error::Failed(format!(
            "Image generation for the {} stopped unexpectedly. Reason: {}. This often relates to safety settings.",
            kind, reason
        )));
    }

    let detail = match response.text.filter(|text| !text.trim().is_empty()) {
        Some(text) => format!(
            "The model did not return an image for the {}. The model responded with text: \"{}\"",
            kind,
            text.trim()
        ),
        None => format!(
            "No image was produced for the {}. This can happen due to safety filters or if the request is too complex. Try rephrasing the instruction.",
            kind
        ),
    };
    Err(Error::Failed(detail))
}
