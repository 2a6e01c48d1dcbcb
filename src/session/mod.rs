//! Session lifecycle: state machine, feedback timeline, orchestrator

pub mod feedback;
pub mod orchestrator;
pub mod state;

pub use feedback::{FeedbackEntry, FeedbackKind, FeedbackTimeline};
pub use orchestrator::{format_elapsed, SessionOrchestrator, SportContext};
pub use state::SessionState;
