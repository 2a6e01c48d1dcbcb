//! Capture & streaming pipeline
//!
//! One combined audio+video source feeds two independent consumers: the
//! streamer pushing samples to the coaching backend, and the recorder
//! persisting the same source for later upload.

pub mod audio;
pub mod device;
pub mod recorder;
pub mod streamer;

pub use audio::MicrophoneDevice;
pub use device::{CaptureDevice, CaptureSource, DeviceError, SyntheticDevice, VideoFrame};
pub use recorder::{RecordedArtifact, Recorder};
pub use streamer::run_streamer;
