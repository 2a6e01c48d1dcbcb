//! Append-only feedback timeline
//!
//! Coaching remarks arrive asynchronously from the backend and are tagged
//! with the elapsed time since the session went active. Entries accumulate
//! in arrival order for the lifetime of one session and are flushed to
//! storage at session end; they are never reordered.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    #[default]
    Coaching,
    Encouragement,
    Correction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// Offset from session start at arrival.
    pub elapsed_ms: u64,
    pub text: String,
    pub kind: FeedbackKind,
}

/// Ordered list of feedback entries for one session.
///
/// Append-only by construction: there is no API to mutate or reorder what
/// has been recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackTimeline {
    entries: Vec<FeedbackEntry>,
}

impl FeedbackTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: FeedbackEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_arrival_order() {
        let mut timeline = FeedbackTimeline::new();
        // Arrival order wins even when elapsed tags are out of order
        // (no timestamp correction).
        timeline.push(FeedbackEntry { elapsed_ms: 5000, text: "later".into(), kind: FeedbackKind::Coaching });
        timeline.push(FeedbackEntry { elapsed_ms: 1000, text: "earlier".into(), kind: FeedbackKind::Correction });

        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.entries()[0].text, "later");
        assert_eq!(timeline.entries()[1].text, "earlier");
    }

    #[test]
    fn test_default_kind_is_coaching() {
        assert_eq!(FeedbackKind::default(), FeedbackKind::Coaching);
    }

    #[test]
    fn test_serialization_shape() {
        let entry = FeedbackEntry { elapsed_ms: 1500, text: "bend your knees".into(), kind: FeedbackKind::Correction };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["elapsedMs"], 1500);
        assert_eq!(json["kind"], "correction");
    }
}
