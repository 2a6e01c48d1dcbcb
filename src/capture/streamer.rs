//! Streaming consumer of the capture source
//!
//! Pushes a JPEG still of the latest frame once per second and forwards
//! audio chunks to the coaching session as they become ready. The two
//! cadences are independent; both stop on the shared cancellation token,
//! which is the transition out of the active session state.

use anyhow::{Context, Result};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::coach::client::CoachSender;
use crate::config::{STILL_INTERVAL_SECS, STILL_JPEG_QUALITY};

use super::device::VideoFrame;

/// Encode one frame as a JPEG still at the fixed streaming quality.
pub fn encode_still(frame: &VideoFrame) -> Result<Bytes> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, STILL_JPEG_QUALITY)
        .encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("jpeg encoding failed")?;
    Ok(Bytes::from(buf))
}

/// Drive the streaming consumer until cancellation.
///
/// Keeps only the most recent frame between ticks; feedback arriving from
/// the backend is consumed elsewhere and never blocks this loop.
pub async fn run_streamer(
    coach: CoachSender,
    mut video: mpsc::Receiver<VideoFrame>,
    mut audio: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(STILL_INTERVAL_SECS));
    let mut latest: Option<VideoFrame> = None;
    let mut video_open = true;
    let mut audio_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                if let Some(frame) = &latest {
                    match encode_still(frame) {
                        Ok(jpeg) => {
                            debug!("pushing {} byte still", jpeg.len());
                            if coach.send_image(jpeg).await.is_err() {
                                warn!("coach session gone, stopping still push");
                                break;
                            }
                        }
                        Err(e) => warn!("skipping still: {}", e),
                    }
                }
            }

            frame = video.recv(), if video_open => {
                match frame {
                    Some(frame) => latest = Some(frame),
                    None => video_open = false,
                }
            }

            chunk = audio.recv(), if audio_open => {
                match chunk {
                    Some(chunk) => {
                        if coach.send_audio(chunk).await.is_err() {
                            warn!("coach session gone, stopping audio push");
                            break;
                        }
                    }
                    None => audio_open = false,
                }
            }
        }

        if !video_open && !audio_open {
            break;
        }
    }

    debug!("streamer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::client::CoachHandle;
    use crate::coach::messages::ClientMessage;
    use crate::config::{AUDIO_MIME, FRAME_HEIGHT, FRAME_WIDTH, IMAGE_MIME};

    fn gray_frame() -> VideoFrame {
        VideoFrame {
            rgb: Bytes::from(vec![127u8; (FRAME_WIDTH * FRAME_HEIGHT * 3) as usize]),
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }

    #[test]
    fn test_encode_still_produces_jpeg() {
        let jpeg = encode_still(&gray_frame()).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streamer_pushes_stills_and_audio() {
        let (outbound_tx, mut outbound_rx) = mpsc::channel(32);
        let (_feedback_tx, feedback_rx) = mpsc::channel(8);
        let handle = CoachHandle::from_channels(outbound_tx, feedback_rx);

        let (video_tx, video_rx) = mpsc::channel(4);
        let (audio_tx, audio_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let streamer = tokio::spawn(run_streamer(handle.sender(), video_rx, audio_rx, cancel.clone()));

        video_tx.send(gray_frame()).await.unwrap();
        audio_tx.send(Bytes::from_static(&[0, 1, 2, 3])).await.unwrap();

        // Let a still interval elapse.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        cancel.cancel();
        streamer.await.unwrap();

        let mut mimes = Vec::new();
        while let Ok(msg) = outbound_rx.try_recv() {
            if let ClientMessage::Media { mime_type, .. } = msg {
                mimes.push(mime_type);
            }
        }
        assert!(mimes.iter().any(|m| m == AUDIO_MIME));
        assert!(mimes.iter().any(|m| m == IMAGE_MIME));
    }

    #[tokio::test]
    async fn test_streamer_stops_when_source_closes() {
        let (outbound_tx, _outbound_rx) = mpsc::channel(32);
        let (_feedback_tx, feedback_rx) = mpsc::channel(8);
        let handle = CoachHandle::from_channels(outbound_tx, feedback_rx);

        let (video_tx, video_rx) = mpsc::channel::<VideoFrame>(4);
        let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(4);
        drop(video_tx);
        drop(audio_tx);

        run_streamer(handle.sender(), video_rx, audio_rx, CancellationToken::new()).await;
    }
}
