//! Microphone capture
//!
//! Captures from the default input device with cpal and resamples to the
//! 16 kHz mono s16 format the coaching backend expects. cpal callbacks run
//! on a dedicated thread; a sync→async bridge hands chunks to tokio.

use async_trait::async_trait;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use log::{error, info};
use std::thread;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::AUDIO_SAMPLE_RATE;

use super::device::{fan_out_audio, CaptureDevice, CaptureSource, DeviceError, SyntheticDevice};

/// Downmix interleaved f32 samples to mono and linearly resample to the
/// target rate, emitting s16le bytes.
fn resample_to_s16_mono(input: &[f32], channels: u16, source_rate: u32) -> Bytes {
    let channels = channels.max(1) as usize;
    let mono: Vec<f32> = input
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    if mono.is_empty() {
        return Bytes::new();
    }

    let ratio = AUDIO_SAMPLE_RATE as f64 / source_rate as f64;
    let out_len = ((mono.len() as f64) * ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len * 2);

    for i in 0..out_len {
        let pos = i as f64 / ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = mono[idx.min(mono.len() - 1)];
        let b = mono[(idx + 1).min(mono.len() - 1)];
        let sample = a + (b - a) * frac;
        let s16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&s16.to_le_bytes());
    }

    Bytes::from(out)
}

fn i16_to_f32(input: &[i16]) -> Vec<f32> {
    input.iter().map(|&s| s as f32 / i16::MAX as f32).collect()
}

pub struct MicrophoneCapture;

impl MicrophoneCapture {
    /// Starts microphone capture and returns a channel of 16 kHz mono s16
    /// chunks. The channel closes when the token is cancelled.
    pub fn start(cancel: CancellationToken) -> Result<mpsc::Receiver<Bytes>, DeviceError> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| DeviceError::Unavailable("no default input device found".into()))?;

        let config = device
            .default_input_config()
            .map_err(|e| classify_cpal_error(e.to_string()))?;

        info!("microphone capture config: {:?}", config);

        let channels = config.channels();
        let source_rate = config.sample_rate();

        // Synchronous channel: cpal callback → bridge thread
        let (sync_tx, sync_rx) = std::sync::mpsc::sync_channel::<Bytes>(256);

        // Async channel: bridge → external consumer
        let (async_tx, async_rx) = mpsc::channel::<Bytes>(256);

        tokio::spawn(async move {
            loop {
                match sync_rx.recv() {
                    Ok(data) => {
                        if async_tx.send(data).await.is_err() {
                            info!("audio output channel closed");
                            break;
                        }
                    }
                    Err(_) => {
                        info!("microphone capture channel closed");
                        break;
                    }
                }
            }
        });

        // cpal requires a dedicated thread for the stream callbacks
        let handle = tokio::runtime::Handle::current();
        let (open_tx, open_rx) = std::sync::mpsc::sync_channel::<Result<(), DeviceError>>(1);
        thread::spawn(move || {
            let err_fn = |err| error!("audio stream error: {}", err);
            let push = move |samples: Vec<f32>| {
                let chunk = resample_to_s16_mono(&samples, channels, source_rate);
                if !chunk.is_empty() {
                    let _ = sync_tx.send(chunk);
                }
            };

            let stream = match config.sample_format() {
                SampleFormat::I16 => device.build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &_| push(i16_to_f32(data)),
                    err_fn,
                    None,
                ),
                SampleFormat::F32 => device.build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &_| push(data.to_vec()),
                    err_fn,
                    None,
                ),
                other => {
                    let _ = open_tx.send(Err(DeviceError::Unavailable(format!(
                        "unsupported sample format: {:?}",
                        other
                    ))));
                    return;
                }
            };

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = open_tx.send(Err(classify_cpal_error(e.to_string())));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = open_tx.send(Err(classify_cpal_error(e.to_string())));
                return;
            }

            let _ = open_tx.send(Ok(()));
            info!("microphone capture started");

            handle.block_on(async move { cancel.cancelled().await });

            let _ = stream.pause();
            info!("microphone capture stopped");
        });

        open_rx
            .recv()
            .map_err(|_| DeviceError::Unavailable("audio thread exited".into()))??;

        Ok(async_rx)
    }
}

/// Permission refusals surface as backend-specific messages; anything else
/// on open means the device is busy or missing.
fn classify_cpal_error(message: String) -> DeviceError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not allowed") {
        DeviceError::PermissionDenied(message)
    } else {
        DeviceError::Unavailable(message)
    }
}

/// Microphone audio combined with synthesized video frames.
///
/// The real camera binding is platform glue supplied by the embedding
/// application; this device keeps the live audio path exercised end to end.
pub struct MicrophoneDevice {
    pub video_fps: u32,
}

impl Default for MicrophoneDevice {
    fn default() -> Self {
        MicrophoneDevice { video_fps: 5 }
    }
}

#[async_trait]
impl CaptureDevice for MicrophoneDevice {
    async fn open(&self, cancel: CancellationToken) -> Result<CaptureSource, DeviceError> {
        let raw_audio = MicrophoneCapture::start(cancel.clone())?;

        let video = SyntheticDevice { fps: self.video_fps }
            .open(cancel.clone())
            .await?
            .video;

        let (audio, media) = fan_out_audio(raw_audio, cancel);
        Ok(CaptureSource { video, audio, media })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_halves_rate() {
        // 32 kHz stereo in, 16 kHz mono s16 out: half the frames, 2 bytes each.
        let input: Vec<f32> = vec![0.5; 64]; // 32 stereo frames
        let out = resample_to_s16_mono(&input, 2, 32_000);
        assert_eq!(out.len(), 16 * 2);
    }

    #[test]
    fn test_resample_clamps_overdriven_samples() {
        let input: Vec<f32> = vec![4.0; 16];
        let out = resample_to_s16_mono(&input, 1, AUDIO_SAMPLE_RATE);
        let first = i16::from_le_bytes([out[0], out[1]]);
        assert_eq!(first, i16::MAX);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample_to_s16_mono(&[], 2, 48_000).is_empty());
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            classify_cpal_error("Operation not allowed by the OS".into()),
            DeviceError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_cpal_error("device is busy".into()),
            DeviceError::Unavailable(_)
        ));
    }
}
