//! Session orchestrator
//!
//! Owns the whole lifecycle of one coaching session: opens the capture
//! device, establishes the streaming coaching session, runs the streamer
//! and recorder side by side, collects timed feedback, and on end uploads
//! the artifact and persists the summarized record. Every collaborator is
//! a trait object so the lifecycle can be driven against test doubles.

use chrono::Local;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{run_streamer, CaptureDevice, DeviceError, Recorder};
use crate::coach::{CoachConnector, CoachHandle};
use crate::error::SessionError;
use crate::pose::Sport;
use crate::session::feedback::{FeedbackEntry, FeedbackTimeline};
use crate::session::state::SessionState;
use crate::storage::{
    artifact_object_name, ArtifactStore, SessionRecord, SessionStore, SessionSummary,
};

/// What the athlete is working on. Preserved across a failed session so a
/// retry does not have to re-enter it.
#[derive(Debug, Clone)]
pub struct SportContext {
    pub sport: Sport,
    pub skill: String,
    pub analysis_type: String,
}

impl Default for SportContext {
    fn default() -> Self {
        SportContext {
            sport: Sport::General,
            skill: String::new(),
            analysis_type: "technique".into(),
        }
    }
}

impl SportContext {
    /// System persona for the coaching backend.
    pub fn persona(&self) -> String {
        format!(
            "You are an expert {} coach watching a live practice session. \
             The athlete is working on: {}. Focus your analysis on {}. \
             Give short, spoken-style feedback on what you see and hear.",
            self.sport, self.skill, self.analysis_type
        )
    }
}

/// Format elapsed whole seconds as mm:ss for display.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// The live half of an active session: everything that must be torn down
/// on end.
struct LiveSession {
    cancel: CancellationToken,
    recorder: Recorder,
    coach: CoachHandle,
    timeline: Arc<Mutex<FeedbackTimeline>>,
    started_at: Instant,
    elapsed_rx: watch::Receiver<u64>,
    streamer: JoinHandle<()>,
    feedback_task: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

pub struct SessionOrchestrator {
    device: Arc<dyn CaptureDevice>,
    coach: Arc<dyn CoachConnector>,
    artifacts: Arc<dyn ArtifactStore>,
    records: Arc<dyn SessionStore>,
    user_id: String,
    recording_dir: PathBuf,
    state: SessionState,
    last_error: Option<SessionError>,
    context: SportContext,
    live: Option<LiveSession>,
}

impl SessionOrchestrator {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        coach: Arc<dyn CoachConnector>,
        artifacts: Arc<dyn ArtifactStore>,
        records: Arc<dyn SessionStore>,
        user_id: impl Into<String>,
        recording_dir: PathBuf,
    ) -> Self {
        SessionOrchestrator {
            device,
            coach,
            artifacts,
            records,
            user_id: user_id.into(),
            recording_dir,
            state: SessionState::Idle,
            last_error: None,
            context: SportContext::default(),
            live: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn context(&self) -> &SportContext {
        &self.context
    }

    /// Once-per-second elapsed-seconds updates while a session is active.
    pub fn elapsed_watch(&self) -> Option<watch::Receiver<u64>> {
        self.live.as_ref().map(|live| live.elapsed_rx.clone())
    }

    /// Snapshot of the feedback collected so far in the active session.
    pub async fn feedback_snapshot(&self) -> Vec<FeedbackEntry> {
        match &self.live {
            Some(live) => live.timeline.lock().await.entries().to_vec(),
            None => Vec::new(),
        }
    }

    /// Acknowledge a finished or failed session, returning to idle.
    pub fn reset(&mut self) {
        if self.live.is_none() && !self.state.is_idle() {
            self.transition(SessionState::Idle);
        }
        self.last_error = None;
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(&next) {
            warn!("forcing invalid session transition {} -> {}", self.state, next);
        }
        debug!("session state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Record a classified failure and return to idle. The sport context is
    /// kept so a retry does not re-enter it.
    fn fail(&mut self, err: SessionError) -> SessionError {
        warn!("session failed ({}): {}", err.classification(), err);
        self.transition(SessionState::Idle);
        self.last_error = Some(err.clone());
        err
    }

    /// Start a session: open the device, establish the coaching session,
    /// then go active with the streamer, recorder and feedback collector
    /// running.
    pub async fn start(&mut self, context: SportContext) -> Result<(), SessionError> {
        if !self.state.is_idle() {
            warn!("start() rejected, session is {}", self.state);
            return Err(SessionError::Busy);
        }
        self.last_error = None;
        self.context = context.clone();
        self.transition(SessionState::Setup);
        info!(
            "starting {} session (skill: {}, analysis: {})",
            context.sport, context.skill, context.analysis_type
        );

        let cancel = CancellationToken::new();
        let source = match self.device.open(cancel.clone()).await {
            Ok(source) => source,
            Err(e) => {
                cancel.cancel();
                let err = match e {
                    DeviceError::PermissionDenied(m) => SessionError::PermissionDenied(m),
                    DeviceError::Unavailable(m) => SessionError::DeviceUnavailable(m),
                };
                return Err(self.fail(err));
            }
        };

        let mut coach = match self.coach.connect(&context.persona(), cancel.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                // Release the already-opened device before reporting.
                cancel.cancel();
                return Err(self.fail(SessionError::HandshakeFailure(format!("{e:#}"))));
            }
        };
        let Some(mut feedback_rx) = coach.take_feedback() else {
            cancel.cancel();
            return Err(self.fail(SessionError::HandshakeFailure(
                "connector returned a handle without a feedback stream".into(),
            )));
        };

        let started_at = Instant::now();
        let local_path = self
            .recording_dir
            .join(format!("session-{}.rec", Local::now().format("%Y%m%d-%H%M%S")));
        let recorder = Recorder::start(local_path, source.media);

        let streamer = tokio::spawn(run_streamer(
            coach.sender(),
            source.video,
            source.audio,
            cancel.clone(),
        ));

        // Feedback arrives untimed; tag each entry with the offset from
        // session start as it lands.
        let timeline = Arc::new(Mutex::new(FeedbackTimeline::new()));
        let feedback_timeline = timeline.clone();
        let feedback_cancel = cancel.clone();
        let feedback_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = feedback_cancel.cancelled() => break,
                    event = feedback_rx.recv() => {
                        let Some(event) = event else { break };
                        let entry = FeedbackEntry {
                            elapsed_ms: started_at.elapsed().as_millis() as u64,
                            text: event.text,
                            kind: event.kind,
                        };
                        debug!("feedback at {} ms: {}", entry.elapsed_ms, entry.text);
                        feedback_timeline.lock().await.push(entry);
                    }
                }
            }
        });

        let (elapsed_tx, elapsed_rx) = watch::channel(0u64);
        let ticker_cancel = cancel.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ticker_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if elapsed_tx.send(started_at.elapsed().as_secs()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.transition(SessionState::Active { started_at });
        self.live = Some(LiveSession {
            cancel,
            recorder,
            coach,
            timeline,
            started_at,
            elapsed_rx,
            streamer,
            feedback_task,
            ticker,
        });
        Ok(())
    }

    /// End the session: stop the live streams, finalize the recording, then
    /// upload and summarize. Calling with no session in progress is a no-op.
    pub async fn end(&mut self) -> Result<Option<SessionRecord>, SessionError> {
        if self.state.is_idle() {
            debug!("end() with no session in progress");
            return Ok(None);
        }
        let Some(live) = self.live.take() else {
            // A finished session that was never acknowledged.
            self.transition(SessionState::Idle);
            return Ok(None);
        };

        self.transition(SessionState::Ending);
        live.cancel.cancel();

        let LiveSession {
            recorder,
            coach,
            timeline,
            started_at,
            streamer,
            feedback_task,
            ticker,
            ..
        } = live;
        let _ = streamer.await;
        let _ = ticker.await;
        let _ = feedback_task.await;
        coach.disconnect().await;

        let artifact = match recorder.stop().await {
            Ok(artifact) => artifact,
            Err(e) => {
                return Err(self.fail(SessionError::SaveFailure(format!(
                    "finalizing recording: {e:#}"
                ))))
            }
        };
        let duration_seconds = started_at.elapsed().as_secs();
        info!("session ended after {}", format_elapsed(duration_seconds));

        self.transition(SessionState::Saving);
        if artifact.is_empty() {
            // Nothing worth uploading; skip both stores entirely.
            let _ = tokio::fs::remove_file(&artifact.path).await;
            return Err(self.fail(SessionError::EmptyArtifact));
        }

        let object_name = artifact_object_name(&self.user_id, Local::now());
        let uploaded = match self.artifacts.upload(&artifact.path, &object_name).await {
            Ok(path) => path,
            Err(e) => {
                warn!("upload failed, keeping {}", artifact.path.display());
                return Err(self.fail(SessionError::SaveFailure(format!("{e:#}"))));
            }
        };

        let summary = SessionSummary {
            artifact_path: uploaded,
            sport: self.context.sport,
            analysis_type: self.context.analysis_type.clone(),
            duration_seconds,
            feedback_timeline: timeline.lock().await.entries().to_vec(),
        };
        let record = match self.records.persist(summary).await {
            Ok(record) => record,
            Err(e) => {
                warn!("summarization failed, keeping {}", artifact.path.display());
                return Err(self.fail(SessionError::SaveFailure(format!("{e:#}"))));
            }
        };

        info!("session saved: id={} score={:?}", record.id, record.overall_score);
        self.transition(SessionState::Done {
            record_id: record.id.clone(),
            overall_score: record.overall_score,
        });
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(61), "01:01");
        assert_eq!(format_elapsed(600), "10:00");
    }

    #[test]
    fn test_persona_names_the_sport_and_skill() {
        let ctx = SportContext {
            sport: Sport::Basketball,
            skill: "free throws".into(),
            analysis_type: "shooting form".into(),
        };
        let persona = ctx.persona();
        assert!(persona.contains("basketball"));
        assert!(persona.contains("free throws"));
        assert!(persona.contains("shooting form"));
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    use crate::capture::{CaptureSource, SyntheticDevice};
    use crate::coach::FeedbackEvent;
    use crate::session::feedback::FeedbackKind;
    use crate::storage::RecordStatus;

    struct DenyingDevice;

    #[async_trait]
    impl CaptureDevice for DenyingDevice {
        async fn open(&self, _cancel: CancellationToken) -> Result<CaptureSource, DeviceError> {
            Err(DeviceError::PermissionDenied("camera blocked".into()))
        }
    }

    /// Opens fine but never produces a single sample.
    struct SilentDevice;

    #[async_trait]
    impl CaptureDevice for SilentDevice {
        async fn open(&self, _cancel: CancellationToken) -> Result<CaptureSource, DeviceError> {
            let (_video_tx, video) = mpsc::channel(1);
            let (_audio_tx, audio) = mpsc::channel(1);
            let (_media_tx, media) = mpsc::channel(1);
            Ok(CaptureSource { video, audio, media })
        }
    }

    /// Connector that hands out a working in-memory session and queues the
    /// given feedback.
    struct ScriptedCoach {
        feedback: Vec<FeedbackEvent>,
    }

    impl ScriptedCoach {
        fn quiet() -> Self {
            ScriptedCoach { feedback: Vec::new() }
        }
    }

    #[async_trait]
    impl CoachConnector for ScriptedCoach {
        async fn connect(&self, _persona: &str, _cancel: CancellationToken) -> Result<CoachHandle> {
            let (outbound_tx, mut outbound_rx) = mpsc::channel(256);
            tokio::spawn(async move { while outbound_rx.recv().await.is_some() {} });

            let (feedback_tx, feedback_rx) = mpsc::channel(16);
            for event in &self.feedback {
                let _ = feedback_tx.try_send(event.clone());
            }
            Ok(CoachHandle::from_channels(outbound_tx, feedback_rx))
        }
    }

    struct RefusingCoach;

    #[async_trait]
    impl CoachConnector for RefusingCoach {
        async fn connect(&self, _persona: &str, _cancel: CancellationToken) -> Result<CoachHandle> {
            bail!("backend refused the session")
        }
    }

    /// In-memory artifact and record store with call counters.
    #[derive(Default)]
    struct MemoryStores {
        uploads: AtomicUsize,
        persists: AtomicUsize,
        fail_upload: AtomicBool,
    }

    #[async_trait]
    impl ArtifactStore for MemoryStores {
        async fn upload(&self, _local: &Path, object_name: &str) -> Result<String> {
            if self.fail_upload.load(Ordering::SeqCst) {
                bail!("artifact store offline");
            }
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("mem://{}", object_name))
        }
    }

    #[async_trait]
    impl SessionStore for MemoryStores {
        async fn persist(&self, summary: SessionSummary) -> Result<SessionRecord> {
            assert!(summary.duration_seconds < 60, "test sessions are short");
            self.persists.fetch_add(1, Ordering::SeqCst);
            Ok(SessionRecord {
                id: "rec-1".into(),
                overall_score: Some(8.0),
                status: RecordStatus::Completed,
            })
        }
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("coachcast-session-{}-{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn orchestrator(
        device: Arc<dyn CaptureDevice>,
        coach: Arc<dyn CoachConnector>,
        stores: Arc<MemoryStores>,
        dir: PathBuf,
    ) -> SessionOrchestrator {
        SessionOrchestrator::new(device, coach, stores.clone(), stores, "athlete-1", dir)
    }

    #[tokio::test]
    async fn test_permission_refusal_returns_to_idle() {
        let stores = Arc::new(MemoryStores::default());
        let mut orch = orchestrator(
            Arc::new(DenyingDevice),
            Arc::new(ScriptedCoach::quiet()),
            stores,
            test_dir("deny"),
        );

        let err = orch.start(SportContext::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied(_)));
        assert!(orch.state().is_idle());
        assert_eq!(orch.last_error().unwrap().classification(), "permission_denied");
    }

    #[tokio::test]
    async fn test_handshake_failure_returns_to_idle() {
        let stores = Arc::new(MemoryStores::default());
        let mut orch = orchestrator(
            Arc::new(SyntheticDevice::default()),
            Arc::new(RefusingCoach),
            stores,
            test_dir("refuse"),
        );

        let err = orch.start(SportContext::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::HandshakeFailure(_)));
        assert!(orch.state().is_idle());
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_active() {
        let stores = Arc::new(MemoryStores::default());
        let mut orch = orchestrator(
            Arc::new(SyntheticDevice::default()),
            Arc::new(ScriptedCoach::quiet()),
            stores,
            test_dir("busy"),
        );

        orch.start(SportContext::default()).await.unwrap();
        let err = orch.start(SportContext::default()).await.unwrap_err();
        assert_eq!(err, SessionError::Busy);
        assert!(orch.state().is_active());

        let _ = orch.end().await;
    }

    #[tokio::test]
    async fn test_end_without_session_is_noop() {
        let stores = Arc::new(MemoryStores::default());
        let mut orch = orchestrator(
            Arc::new(SyntheticDevice::default()),
            Arc::new(ScriptedCoach::quiet()),
            stores.clone(),
            test_dir("noop"),
        );

        assert!(orch.end().await.unwrap().is_none());
        assert!(orch.state().is_idle());
        assert_eq!(stores.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_artifact_skips_both_stores() {
        let stores = Arc::new(MemoryStores::default());
        let mut orch = orchestrator(
            Arc::new(SilentDevice),
            Arc::new(ScriptedCoach::quiet()),
            stores.clone(),
            test_dir("empty"),
        );

        orch.start(SportContext::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = orch.end().await.unwrap_err();

        assert_eq!(err, SessionError::EmptyArtifact);
        assert!(orch.state().is_idle());
        assert_eq!(stores.uploads.load(Ordering::SeqCst), 0);
        assert_eq!(stores.persists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_session_reaches_done() {
        let stores = Arc::new(MemoryStores::default());
        let coach = ScriptedCoach {
            feedback: vec![FeedbackEvent {
                text: "nice follow-through".into(),
                kind: FeedbackKind::Encouragement,
            }],
        };
        let mut orch = orchestrator(
            Arc::new(SyntheticDevice { fps: 30 }),
            Arc::new(coach),
            stores.clone(),
            test_dir("done"),
        );

        let context = SportContext {
            sport: Sport::Basketball,
            skill: "jump shot".into(),
            analysis_type: "form".into(),
        };
        orch.start(context).await.unwrap();
        assert!(orch.state().is_active());
        assert!(orch.elapsed_watch().is_some());

        // Let the capture pipeline produce at least one segment's worth.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(orch.feedback_snapshot().await.len(), 1);

        let record = orch.end().await.unwrap().unwrap();
        assert_eq!(record.id, "rec-1");
        assert_eq!(
            orch.state(),
            &SessionState::Done { record_id: "rec-1".into(), overall_score: Some(8.0) }
        );
        assert_eq!(stores.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(stores.persists.load(Ordering::SeqCst), 1);

        orch.reset();
        assert!(orch.state().is_idle());
    }

    #[tokio::test]
    async fn test_save_failure_returns_to_idle_and_keeps_artifact() {
        let stores = Arc::new(MemoryStores::default());
        stores.fail_upload.store(true, Ordering::SeqCst);
        let dir = test_dir("savefail");
        let mut orch = orchestrator(
            Arc::new(SyntheticDevice::default()),
            Arc::new(ScriptedCoach::quiet()),
            stores.clone(),
            dir.clone(),
        );

        orch.start(SportContext::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let err = orch.end().await.unwrap_err();

        assert!(matches!(err, SessionError::SaveFailure(_)));
        assert!(orch.state().is_idle());
        assert_eq!(stores.persists.load(Ordering::SeqCst), 0);

        // The local recording survives a failed save.
        let kept = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().ends_with(".rec"));
        assert!(kept);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
