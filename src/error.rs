//! Classified session errors
//!
//! Every capture or network failure is mapped to one of these
//! classifications at the orchestrator boundary, together with a return to
//! the idle state. All variants are recoverable; the remedy differs per
//! classification, which is why permission refusal and device
//! unavailability stay distinct.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Camera/microphone access was refused. The user grants access and
    /// retries.
    #[error("capture device access denied: {0}")]
    PermissionDenied(String),

    /// Camera/microphone busy elsewhere or hardware absent.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The streaming coaching session could not be established.
    #[error("coaching session handshake failed: {0}")]
    HandshakeFailure(String),

    /// The recorder produced a zero-size artifact; saving is skipped
    /// entirely.
    #[error("nothing was recorded")]
    EmptyArtifact,

    /// Artifact upload or session summarization failed. The local recording
    /// is kept so the save can be retried.
    #[error("failed to save session: {0}")]
    SaveFailure(String),

    /// A session is already in progress; `start()` is rejected without
    /// touching it.
    #[error("a session is already in progress")]
    Busy,
}

impl SessionError {
    /// All classified failures leave the orchestrator in a retryable idle
    /// state; `Busy` is the exception since no state was changed at all.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SessionError::Busy)
    }

    /// Short classification tag for logs and UI.
    pub fn classification(&self) -> &'static str {
        match self {
            SessionError::PermissionDenied(_) => "permission_denied",
            SessionError::DeviceUnavailable(_) => "device_unavailable",
            SessionError::HandshakeFailure(_) => "handshake_failure",
            SessionError::EmptyArtifact => "empty_artifact",
            SessionError::SaveFailure(_) => "save_failure",
            SessionError::Busy => "busy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_tags() {
        assert_eq!(
            SessionError::PermissionDenied("no camera".into()).classification(),
            "permission_denied"
        );
        assert_eq!(SessionError::EmptyArtifact.classification(), "empty_artifact");
    }

    #[test]
    fn test_display() {
        let err = SessionError::DeviceUnavailable("mic in use".into());
        assert_eq!(err.to_string(), "capture device unavailable: mic in use");
        assert_eq!(SessionError::EmptyArtifact.to_string(), "nothing was recorded");
    }

    #[test]
    fn test_recoverability() {
        assert!(SessionError::HandshakeFailure("timeout".into()).is_recoverable());
        assert!(SessionError::EmptyArtifact.is_recoverable());
        assert!(!SessionError::Busy.is_recoverable());
    }
}
