//! Error taxonomy for Retouch operations

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Everything an editing operation can end in other than a new artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Request was blocked. Reason: {reason}.{}", refusal_suffix(.message))]
    Refused {
        reason: String,
        message: Option<String>,
    },

    #[error("Operation failed: {0}")]
    Failed(String),

    #[error(
        "Video generation timed out after {} ({attempts} attempts at {interval_secs}s)",
        timeout_bound(.attempts, .interval_secs)
    )]
    Timeout { attempts: u32, interval_secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,
}

fn refusal_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" {}", m))
        .unwrap_or_default()
}

/// Whole minutes when the bound divides evenly, seconds otherwise
fn timeout_bound(attempts: &u32, interval_secs: &u64) -> String {
    let total = u64::from(*attempts) * interval_secs;
    match total {
        60 => "1 minute".to_string(),
        t if t > 0 && t % 60 == 0 => format!("{} minutes", t / 60),
        t => format!("{} seconds", t),
    }
}

impl Error {
    /// Get the error code for logs and user-facing payloads
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Precondition(_) => "PRECONDITION_FAILED",
            Error::Refused { .. } => "REFUSED",
            Error::Failed(_) => "FAILED",
            Error::Timeout { .. } => "TIMEOUT",
            Error::Cancelled => "CANCELLED",
        }
    }

    /// Whether the UI should offer a "please retry" affordance.
    ///
    /// Refusals are expected outcomes and input errors need a different input,
    /// so only transport-ish failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Failed(_) | Error::Timeout { .. })
    }

    /// Message suitable for showing verbatim to a user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Failed(_) | Error::Timeout { .. } => {
                format!("{} Please try again.", self)
            }
            _ => self.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Failed(err.to_string())
    }
}
