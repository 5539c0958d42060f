//! State machines for Retouch operations
//!
//! The long-running animate operation is tracked with a formal state machine:
//! - Valid states
//! - Events that trigger transitions
//! - Terminal states

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot transition from {from} via {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Terminal state: {0} is a terminal state and cannot transition")]
    TerminalState(String),
}

// ============================================================================
// Video Job State Machine
// ============================================================================

/// Lifecycle of an image-to-video generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoJobState {
    Initiating,
    Polling,
    Complete,
    Downloading,
    Succeeded,
    TimedOut,
    Errored,
    DownloadFailed,
    Cancelled,
}

impl VideoJobState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::TimedOut | Self::Errored | Self::DownloadFailed | Self::Cancelled
        )
    }

    /// Only a successful download yields an artifact
    pub fn yields_artifact(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [VideoJobState] {
        match self {
            Self::Initiating => &[Self::Polling, Self::Errored, Self::Cancelled],
            Self::Polling => &[
                Self::Polling,
                Self::Complete,
                Self::TimedOut,
                Self::Errored,
                Self::Cancelled,
            ],
            Self::Complete => &[Self::Downloading, Self::Errored, Self::Cancelled],
            Self::Downloading => &[Self::Succeeded, Self::DownloadFailed, Self::Cancelled],
            Self::Succeeded => &[],
            Self::TimedOut => &[],
            Self::Errored => &[],
            Self::DownloadFailed => &[],
            Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for VideoJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiating => write!(f, "initiating"),
            Self::Polling => write!(f, "polling"),
            Self::Complete => write!(f, "complete"),
            Self::Downloading => write!(f, "downloading"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Errored => write!(f, "errored"),
            Self::DownloadFailed => write!(f, "download_failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events that trigger video job state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum VideoJobEvent {
    /// Service accepted the initiate request and returned a handle
    Submitted,
    /// Initiate request was rejected or failed in transport
    SubmitFailed,
    /// A status check reported the operation still running
    StillRunning,
    /// A status check reported the operation done
    Done,
    /// The operation finished with an error, or its status could not be read
    OperationFailed,
    /// Attempt ceiling reached without completion
    CeilingReached,
    /// Done, but no downloadable result reference
    NoOutput,
    /// Fetching the result bytes began
    StartDownload,
    /// Result bytes fetched
    Downloaded,
    /// Result fetch returned a non-success status or failed in transport
    DownloadError,
    /// Caller cancelled the job
    Cancel,
}

impl std::fmt::Display for VideoJobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::SubmitFailed => write!(f, "submit_failed"),
            Self::StillRunning => write!(f, "still_running"),
            Self::Done => write!(f, "done"),
            Self::OperationFailed => write!(f, "operation_failed"),
            Self::CeilingReached => write!(f, "ceiling_reached"),
            Self::NoOutput => write!(f, "no_output"),
            Self::StartDownload => write!(f, "start_download"),
            Self::Downloaded => write!(f, "downloaded"),
            Self::DownloadError => write!(f, "download_error"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Video job state machine
pub struct VideoJobStateMachine;

impl VideoJobStateMachine {
    /// Attempt a state transition
    ///
    /// Returns the new state if the transition is valid, or an error otherwise.
    pub fn transition(
        current: VideoJobState,
        event: VideoJobEvent,
    ) -> Result<VideoJobState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            // Cancellation is accepted from any live state
            (_, VideoJobEvent::Cancel) => VideoJobState::Cancelled,

            // From Initiating
            (VideoJobState::Initiating, VideoJobEvent::Submitted) => VideoJobState::Polling,
            (VideoJobState::Initiating, VideoJobEvent::SubmitFailed) => VideoJobState::Errored,

            // From Polling
            (VideoJobState::Polling, VideoJobEvent::StillRunning) => VideoJobState::Polling,
            (VideoJobState::Polling, VideoJobEvent::Done) => VideoJobState::Complete,
            (VideoJobState::Polling, VideoJobEvent::OperationFailed) => VideoJobState::Errored,
            (VideoJobState::Polling, VideoJobEvent::CeilingReached) => VideoJobState::TimedOut,

            // From Complete
            (VideoJobState::Complete, VideoJobEvent::StartDownload) => VideoJobState::Downloading,
            (VideoJobState::Complete, VideoJobEvent::NoOutput) => VideoJobState::Errored,

            // From Downloading
            (VideoJobState::Downloading, VideoJobEvent::Downloaded) => VideoJobState::Succeeded,
            (VideoJobState::Downloading, VideoJobEvent::DownloadError) => {
                VideoJobState::DownloadFailed
            }

            // Invalid transitions
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: VideoJobState, event: &VideoJobEvent) -> bool {
        Self::transition(current, event.clone()).is_ok()
    }
}
