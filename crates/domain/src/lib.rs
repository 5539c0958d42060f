//! Domain entities, edit history, and state machines for Retouch

pub mod artifact;
pub mod history;
pub mod hotspot;
pub mod operation;
pub mod state;

pub use artifact::{Artifact, MediaKind};
pub use history::History;
pub use hotspot::Hotspot;
pub use operation::{OperationKind, OperationRequest};
pub use state::{StateError, VideoJobEvent, VideoJobState, VideoJobStateMachine};
