//! Nearest-frame selection for playback synchronization

use super::frame::PoseFrame;

/// Maximum distance between playback time and a frame's timestamp for the
/// frame to still be considered a match. Beyond this the caller must render
/// nothing rather than stale data.
pub const MATCH_TOLERANCE_SECS: f64 = 0.5;

/// The frame whose timestamp is closest to `time`, or `None` when even the
/// closest frame is more than [`MATCH_TOLERANCE_SECS`] away.
pub fn closest_frame(frames: &[PoseFrame], time: f64) -> Option<&PoseFrame> {
    let mut best: Option<(&PoseFrame, f64)> = None;

    for frame in frames {
        let distance = (frame.timestamp - time).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((frame, distance)),
        }
    }

    best.filter(|(_, d)| *d <= MATCH_TOLERANCE_SECS).map(|(f, _)| f)
}
