//! Transformation requests sent to the remote service

use serde::{Deserialize, Serialize};

use retouch_common::{Error, Result};

use crate::artifact::{Artifact, MediaKind};
use crate::hotspot::Hotspot;

/// Named transformation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Edit,
    Filter,
    Adjustment,
    ThreeDView,
    BackgroundRemoval,
    Restore,
    GroupRestore,
    Animate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        Self::Edit,
        Self::Filter,
        Self::Adjustment,
        Self::ThreeDView,
        Self::BackgroundRemoval,
        Self::Restore,
        Self::GroupRestore,
        Self::Animate,
    ];

    /// Whether the caller must supply a non-empty instruction
    pub fn requires_instruction(&self) -> bool {
        matches!(
            self,
            Self::Edit | Self::Filter | Self::Adjustment | Self::Animate
        )
    }

    pub fn requires_hotspot(&self) -> bool {
        matches!(self, Self::Edit)
    }

    /// Animate runs as initiate/poll/fetch; everything else is one round trip
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::Animate)
    }

    pub fn output_kind(&self) -> MediaKind {
        match self {
            Self::Animate => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }

    /// Prefix for names of artifacts this kind produces
    pub fn artifact_label(&self) -> &'static str {
        match self {
            Self::Edit => "edited",
            Self::Filter => "filtered",
            Self::Adjustment => "adjusted",
            Self::ThreeDView => "3d-view",
            Self::BackgroundRemoval => "background-removed",
            Self::Restore => "restored",
            Self::GroupRestore => "group-restored",
            Self::Animate => "animated",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit => write!(f, "edit"),
            Self::Filter => write!(f, "filter"),
            Self::Adjustment => write!(f, "adjustment"),
            Self::ThreeDView => write!(f, "3d_view"),
            Self::BackgroundRemoval => write!(f, "background_removal"),
            Self::Restore => write!(f, "restore"),
            Self::GroupRestore => write!(f, "group_restore"),
            Self::Animate => write!(f, "animate"),
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "edit" => Ok(Self::Edit),
            "filter" => Ok(Self::Filter),
            "adjustment" | "adjust" => Ok(Self::Adjustment),
            "3d_view" | "three_d_view" => Ok(Self::ThreeDView),
            "background_removal" | "remove_background" => Ok(Self::BackgroundRemoval),
            "restore" => Ok(Self::Restore),
            "group_restore" => Ok(Self::GroupRestore),
            "animate" => Ok(Self::Animate),
            other => Err(Error::InvalidInput(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

/// A validated request to transform the source artifact
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub source: Artifact,
    pub instruction: Option<String>,
    pub hotspot: Option<Hotspot>,
}

impl OperationRequest {
    /// Build a request, enforcing the per-kind preconditions
    pub fn new(
        kind: OperationKind,
        source: Artifact,
        instruction: Option<String>,
        hotspot: Option<Hotspot>,
    ) -> Result<Self> {
        let request = Self {
            kind,
            source,
            instruction: instruction.map(|text| text.trim().to_string()),
            hotspot,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn edit(source: Artifact, instruction: impl Into<String>, hotspot: Hotspot) -> Result<Self> {
        Self::new(
            OperationKind::Edit,
            source,
            Some(instruction.into()),
            Some(hotspot),
        )
    }

    /// Request for a kind that carries user text (filter, adjustment, animate)
    pub fn with_instruction(
        kind: OperationKind,
        source: Artifact,
        instruction: impl Into<String>,
    ) -> Result<Self> {
        Self::new(kind, source, Some(instruction.into()), None)
    }

    /// Request for a zero-parameter kind
    pub fn preset(kind: OperationKind, source: Artifact) -> Result<Self> {
        Self::new(kind, source, None, None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.kind != MediaKind::Image {
            return Err(Error::InvalidInput(format!(
                "The {} operation requires an image, but the current artifact is a {}",
                self.kind, self.source.kind
            )));
        }

        if self.source.is_empty() {
            return Err(Error::InvalidInput("Source image is empty".to_string()));
        }

        if self.kind.requires_instruction()
            && self.instruction.as_deref().map_or(true, str::is_empty)
        {
            return Err(Error::InvalidInput(format!(
                "The {} operation requires a non-empty instruction",
                self.kind
            )));
        }

        if self.kind.requires_hotspot() && self.hotspot.is_none() {
            return Err(Error::InvalidInput(
                "Select a point on the image to edit".to_string(),
            ));
        }

        Ok(())
    }

    /// User instruction; empty for zero-parameter kinds
    pub fn instruction_text(&self) -> &str {
        self.instruction.as_deref().unwrap_or("")
    }
}
