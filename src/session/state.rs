//! Session state management

use std::time::Instant;

/// Session state machine
///
/// Represents the current phase of one coaching session. Transitions are
/// validated so every failure path lands back in `Idle` and the saving
/// phase can never be entered without first ending the live streams.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No session in progress
    Idle,

    /// Capture and coaching connections are being established
    Setup,

    /// Live session: streaming, recording and feedback all running
    Active {
        /// When the session went live
        started_at: Instant,
    },

    /// Live streams are being torn down (transitioning to Saving)
    Ending,

    /// Artifact upload and summarization in flight
    Saving,

    /// Session saved; the summarized record is available
    Done {
        record_id: String,
        overall_score: Option<f32>,
    },
}

impl SessionState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;

        match (self, target) {
            // From Idle
            (Idle, Setup) => true,

            // From Setup
            (Setup, Active { .. }) => true,
            (Setup, Idle) => true, // Device or handshake failure

            // From Active
            (Active { .. }, Ending) => true,
            (Active { .. }, Idle) => true, // Mid-session failure

            // From Ending
            (Ending, Saving) => true,
            (Ending, Idle) => true, // Recorder finalization failure

            // From Saving
            (Saving, Done { .. }) => true,
            (Saving, Idle) => true, // Empty artifact or save failure

            // From Done
            (Done { .. }, Idle) => true,

            // Self-transitions
            (a, b) if a == b => true,

            // All other transitions invalid
            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Setup => "Setup",
            SessionState::Active { .. } => "Active",
            SessionState::Ending => "Ending",
            SessionState::Saving => "Saving",
            SessionState::Done { .. } => "Done",
        }
    }

    /// Check if a session is currently live
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }

    /// Check if no session is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Check if the session is winding down (ending or saving)
    pub fn is_finishing(&self) -> bool {
        matches!(self, SessionState::Ending | SessionState::Saving)
    }

    /// Get the duration since the session went live (if active)
    pub fn active_duration(&self) -> Option<std::time::Duration> {
        if let SessionState::Active { started_at } = self {
            Some(started_at.elapsed())
        } else {
            None
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let idle = SessionState::Idle;
        let setup = SessionState::Setup;
        let active = SessionState::Active {
            started_at: Instant::now(),
        };
        let ending = SessionState::Ending;
        let saving = SessionState::Saving;
        let done = SessionState::Done {
            record_id: "rec-1".into(),
            overall_score: Some(7.0),
        };

        // The happy path
        assert!(idle.can_transition_to(&setup));
        assert!(setup.can_transition_to(&active));
        assert!(active.can_transition_to(&ending));
        assert!(ending.can_transition_to(&saving));
        assert!(saving.can_transition_to(&done));
        assert!(done.can_transition_to(&idle));

        // Self-transitions
        assert!(idle.can_transition_to(&idle));
        assert!(active.can_transition_to(&active));
    }

    #[test]
    fn test_failure_paths_return_to_idle() {
        let idle = SessionState::Idle;
        assert!(SessionState::Setup.can_transition_to(&idle));
        assert!(SessionState::Active { started_at: Instant::now() }.can_transition_to(&idle));
        assert!(SessionState::Saving.can_transition_to(&idle));
    }

    #[test]
    fn test_invalid_transitions() {
        let idle = SessionState::Idle;
        let active = SessionState::Active {
            started_at: Instant::now(),
        };
        let saving = SessionState::Saving;
        let done = SessionState::Done {
            record_id: "rec-1".into(),
            overall_score: None,
        };

        assert!(!idle.can_transition_to(&active)); // Must go through Setup
        assert!(!idle.can_transition_to(&saving)); // Nothing to save
        assert!(!active.can_transition_to(&done)); // Must end and save first
        assert!(!active.can_transition_to(&saving)); // Streams must end first
        assert!(!done.can_transition_to(&active)); // New sessions start over
    }

    #[test]
    fn test_state_checks() {
        let active = SessionState::Active {
            started_at: Instant::now(),
        };

        assert!(active.is_active());
        assert!(!active.is_idle());
        assert!(active.active_duration().is_some());

        assert!(SessionState::Idle.is_idle());
        assert!(SessionState::Ending.is_finishing());
        assert!(SessionState::Saving.is_finishing());
        assert!(SessionState::Saving.active_duration().is_none());
    }
}
