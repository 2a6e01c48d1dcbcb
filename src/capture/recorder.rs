//! Session recorder
//!
//! Independent consumer of the capture source: accumulates ~one-second
//! media segments into a single container file for later single-file
//! upload. Its lifetime is bound strictly to the active session state —
//! started exactly on entry, stopped exactly on exit.

use anyhow::{Context, Result};
use bytes::Bytes;
use log::{debug, info};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The finalized recording on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

impl RecordedArtifact {
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

pub struct Recorder {
    path: PathBuf,
    cancel: CancellationToken,
    task: JoinHandle<Result<u64>>,
}

impl Recorder {
    /// Start recording segments from `media` into `path`.
    pub fn start(path: PathBuf, mut media: mpsc::Receiver<Bytes>) -> Recorder {
        let cancel = CancellationToken::new();
        let write_cancel = cancel.clone();
        let write_path = path.clone();

        let task = tokio::spawn(async move {
            let mut file = File::create(&write_path)
                .await
                .with_context(|| format!("creating {}", write_path.display()))?;
            let mut written: u64 = 0;

            loop {
                tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    segment = media.recv() => {
                        let Some(segment) = segment else { break };
                        file.write_all(&segment).await?;
                        written += segment.len() as u64;
                        debug!("recorded segment of {} bytes ({} total)", segment.len(), written);
                    }
                }
            }

            // Drain segments already queued before the stop.
            while let Ok(segment) = media.try_recv() {
                file.write_all(&segment).await?;
                written += segment.len() as u64;
            }

            file.flush().await?;
            file.sync_all().await?;
            Ok(written)
        });

        info!("recorder started: {}", path.display());
        Recorder { path, cancel, task }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Stop recording and finalize the file.
    pub async fn stop(self) -> Result<RecordedArtifact> {
        self.cancel.cancel();
        let bytes = self.task.await.context("recorder task panicked")??;
        info!("recorder stopped: {} bytes at {}", bytes, self.path.display());
        Ok(RecordedArtifact { path: self.path, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("coachcast-test-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_records_segments_to_one_file() {
        let path = temp_file("segments.bin");
        let (tx, rx) = mpsc::channel(8);
        let recorder = Recorder::start(path.clone(), rx);

        tx.send(Bytes::from_static(b"one-")).await.unwrap();
        tx.send(Bytes::from_static(b"two-")).await.unwrap();
        tx.send(Bytes::from_static(b"three")).await.unwrap();
        drop(tx);

        let artifact = recorder.stop().await.unwrap();
        assert_eq!(artifact.bytes, 13);
        assert!(!artifact.is_empty());

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, b"one-two-three");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_zero_size_artifact_detected() {
        let path = temp_file("empty.bin");
        let (tx, rx) = mpsc::channel::<Bytes>(1);
        let recorder = Recorder::start(path.clone(), rx);
        drop(tx);

        let artifact = recorder.stop().await.unwrap();
        assert!(artifact.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_stop_drains_queued_segments() {
        let path = temp_file("drain.bin");
        let (tx, rx) = mpsc::channel(8);

        // Queue before the recorder gets a chance to run.
        tx.send(Bytes::from_static(b"queued")).await.unwrap();
        let recorder = Recorder::start(path.clone(), rx);
        let artifact = recorder.stop().await.unwrap();

        assert_eq!(artifact.bytes, 6);
        let _ = std::fs::remove_file(&path);
    }
}
