//! Capture device abstraction
//!
//! A capture device produces one combined audio+video source with three
//! consumers' worth of streams: raw video frames for the still pusher,
//! 16 kHz mono s16 audio chunks for the streaming session, and opaque
//! ~one-second media segments for the recorder. Platform bindings live
//! behind the [`CaptureDevice`] trait so any underlying API can be plugged
//! in.

use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{AUDIO_SAMPLE_RATE, FRAME_HEIGHT, FRAME_WIDTH, SEGMENT_SECS};

/// One raw RGB8 frame at the working resolution.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub rgb: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Why a device could not be opened. The two classifications stay distinct
/// because the remedy differs: refused permission needs a user grant, an
/// unavailable device needs freeing or plugging in.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device access denied: {0}")]
    PermissionDenied(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// The streams of an opened device. All of them end when the open-time
/// cancellation token fires.
pub struct CaptureSource {
    /// Raw frames at the working resolution.
    pub video: mpsc::Receiver<VideoFrame>,
    /// 16 kHz mono s16 chunks, event-driven.
    pub audio: mpsc::Receiver<Bytes>,
    /// Opaque container segments of roughly one second each.
    pub media: mpsc::Receiver<Bytes>,
}

#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn open(&self, cancel: CancellationToken) -> Result<CaptureSource, DeviceError>;
}

/// Duplicate an audio stream into a streaming copy and ~1 s media segments.
///
/// `Bytes` clones are reference-counted, so the fan-out is cheap.
pub(crate) fn fan_out_audio(
    mut source: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) -> (mpsc::Receiver<Bytes>, mpsc::Receiver<Bytes>) {
    let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(256);
    let (media_tx, media_rx) = mpsc::channel::<Bytes>(64);

    tokio::spawn(async move {
        let segment_bytes = (AUDIO_SAMPLE_RATE as usize * 2) * SEGMENT_SECS as usize;
        let mut segment: Vec<u8> = Vec::with_capacity(segment_bytes);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                chunk = source.recv() => {
                    let Some(chunk) = chunk else { break };
                    segment.extend_from_slice(&chunk);
                    if audio_tx.send(chunk).await.is_err() {
                        break;
                    }
                    if segment.len() >= segment_bytes {
                        let full = Bytes::from(std::mem::take(&mut segment));
                        if media_tx.send(full).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        // Flush the trailing partial segment so short recordings are not empty.
        if !segment.is_empty() {
            let _ = media_tx.try_send(Bytes::from(segment));
        }
    });

    (audio_rx, media_rx)
}

/// A device that synthesizes a test pattern and silence.
///
/// Used for dry runs of the full session pipeline when no camera or
/// microphone is wired up, and by the integration tests.
pub struct SyntheticDevice {
    /// Frames per second of the synthesized video.
    pub fps: u32,
}

impl Default for SyntheticDevice {
    fn default() -> Self {
        SyntheticDevice { fps: 5 }
    }
}

impl SyntheticDevice {
    fn make_frame(index: u64) -> VideoFrame {
        let (w, h) = (FRAME_WIDTH, FRAME_HEIGHT);
        let mut rgb = vec![0u8; (w * h * 3) as usize];
        let shade = (index % 256) as u8;
        for px in rgb.chunks_exact_mut(3) {
            px[0] = shade;
            px[1] = shade;
            px[2] = shade;
        }
        VideoFrame { rgb: Bytes::from(rgb), width: w, height: h }
    }
}

#[async_trait]
impl CaptureDevice for SyntheticDevice {
    async fn open(&self, cancel: CancellationToken) -> Result<CaptureSource, DeviceError> {
        info!("opening synthetic capture device at {} fps", self.fps);

        let (video_tx, video_rx) = mpsc::channel::<VideoFrame>(8);
        let fps = self.fps.max(1);
        let video_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
            let mut index = 0u64;
            loop {
                tokio::select! {
                    _ = video_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if video_tx.send(Self::make_frame(index)).await.is_err() {
                            break;
                        }
                        index += 1;
                    }
                }
            }
        });

        // 100 ms of silence per chunk, as the hardware would deliver it.
        let (raw_tx, raw_rx) = mpsc::channel::<Bytes>(64);
        let audio_cancel = cancel.clone();
        tokio::spawn(async move {
            let chunk = Bytes::from(vec![0u8; AUDIO_SAMPLE_RATE as usize * 2 / 10]);
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            loop {
                tokio::select! {
                    _ = audio_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if raw_tx.send(chunk.clone()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let (audio, media) = fan_out_audio(raw_rx, cancel);
        Ok(CaptureSource { video: video_rx, audio, media })
    }
}
