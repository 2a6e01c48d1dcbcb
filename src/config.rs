//! Application identity, paths, and capture/stream constants

use std::env::var_os;
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

/// Returns a version as specified in Cargo.toml
pub fn app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

// ── Capture & streaming constants ───────────────────────────────────────────

/// Working capture resolution. Frames are captured at this size regardless
/// of the device's native resolution.
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// JPEG quality for the once-per-second still pushed to the coach backend.
pub const STILL_JPEG_QUALITY: u8 = 70;

/// Interval between stills sent to the streaming session.
pub const STILL_INTERVAL_SECS: u64 = 1;

/// Audio pushed to the backend: 16 kHz mono signed 16-bit.
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Target duration of one recorded media segment.
pub const SEGMENT_SECS: u64 = 1;

/// Mime types on the streaming session wire.
pub const IMAGE_MIME: &str = "image/jpeg";
pub const AUDIO_MIME: &str = "audio/pcm;rate=16000";

// ── Paths ───────────────────────────────────────────────────────────────────

fn home_path() -> Option<String> {
    #[cfg(not(target_os = "windows"))]
    let home = var_os("HOME").map(|home| home.to_string_lossy().to_string());

    #[cfg(target_os = "windows")]
    let home = var_os("HOMEDRIVE").and_then(|drive| {
        var_os("HOMEPATH")
            .map(|home| format!("{}{}", drive.to_string_lossy(), home.to_string_lossy()))
    });

    home
}

/// Directory where session recordings land before upload. Created on first
/// use.
pub fn default_recording_dir() -> PathBuf {
    let path = if let Some(home) = home_path() {
        PathBuf::from(home).join(app_name())
    } else {
        PathBuf::from(".")
    };

    DirBuilder::new()
        .recursive(true)
        .create(Path::new(&path))
        .ok();

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_identity() {
        assert_eq!(app_name(), "coachcast");
        assert!(!app_version().is_empty());
    }

    #[test]
    fn test_audio_mime_carries_rate() {
        assert!(AUDIO_MIME.contains(&AUDIO_SAMPLE_RATE.to_string()));
    }
}
