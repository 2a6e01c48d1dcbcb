//! Pose frames and extraction result sets

use serde::{Deserialize, Serialize};

use super::joint::{Joint, JointName, Point};

/// One timestamped snapshot of all tracked joints.
///
/// Timestamps are monotonic (non-decreasing) within a [`PoseFrameSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseFrame {
    pub frame_number: u32,
    /// Seconds from the start of the clip.
    pub timestamp: f64,
    pub joints: Vec<Joint>,
}

impl PoseFrame {
    pub fn new(frame_number: u32, timestamp: f64, joints: Vec<Joint>) -> Self {
        PoseFrame { frame_number, timestamp, joints }
    }

    /// Look up a joint by landmark name.
    pub fn joint(&self, name: JointName) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Position of a landmark, only when that landmark is visible.
    pub fn visible_position(&self, name: JointName) -> Option<Point> {
        self.joint(name).filter(|j| j.visible).map(|j| j.position)
    }

    /// True when every named landmark is present and visible.
    pub fn all_visible(&self, names: &[JointName]) -> bool {
        names.iter().all(|n| self.visible_position(*n).is_some())
    }
}

/// The immutable result of one pose-extraction request.
///
/// Never mutated in place; re-analysis of a clip produces a whole new set
/// that replaces the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseFrameSet {
    frames: Vec<PoseFrame>,
    pub fps: f32,
    pub total_frames: u32,
    /// Clip duration in seconds.
    pub duration: f64,
}

impl PoseFrameSet {
    /// Build a set, enforcing non-decreasing timestamps.
    pub fn new(frames: Vec<PoseFrame>, fps: f32, total_frames: u32, duration: f64) -> anyhow::Result<Self> {
        for pair in frames.windows(2) {
            if pair[1].timestamp < pair[0].timestamp {
                anyhow::bail!(
                    "pose frames out of order: frame {} at {:.3}s precedes frame {} at {:.3}s",
                    pair[1].frame_number,
                    pair[1].timestamp,
                    pair[0].frame_number,
                    pair[0].timestamp
                );
            }
        }
        Ok(PoseFrameSet { frames, fps, total_frames, duration })
    }

    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}
