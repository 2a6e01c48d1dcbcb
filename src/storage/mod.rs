//! Durable storage collaborators
//!
//! Two stores finish a session: the artifact store takes the recording as a
//! single binary object at a user-scoped, timestamp-named path, and the
//! session store persists the summarized record. Both are traits so the
//! orchestrator can be driven against test doubles.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pose::Sport;
use crate::session::feedback::FeedbackEntry;

/// Session metadata submitted for summarization after the artifact upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub artifact_path: String,
    pub sport: Sport,
    pub analysis_type: String,
    pub duration_seconds: u64,
    pub feedback_timeline: Vec<FeedbackEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Completed,
    Failed,
}

/// The summarized record returned by the session store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub overall_score: Option<f32>,
    pub status: RecordStatus,
}

/// Object name for a recording: scoped by user identity, named from the
/// session end time.
pub fn artifact_object_name(user_id: &str, at: DateTime<Local>) -> String {
    format!("{}/{}.rec", user_id, at.format("%Y%m%d-%H%M%S"))
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload the local file as `object_name`, returning the durable path.
    async fn upload(&self, local: &Path, object_name: &str) -> Result<String>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn persist(&self, summary: SessionSummary) -> Result<SessionRecord>;
}

fn blocking_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(10)))
        .timeout_recv_body(Some(Duration::from_secs(120)))
        .build();
    ureq::Agent::new_with_config(config)
}

/// HTTP artifact store: one binary PUT per recording.
pub struct HttpArtifactStore {
    base_url: String,
}

impl HttpArtifactStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpArtifactStore { base_url: base_url.into() }
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn upload(&self, local: &Path, object_name: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), object_name);
        let local: PathBuf = local.to_path_buf();

        let uploaded = tokio::task::spawn_blocking(move || -> Result<String> {
            let data = std::fs::read(&local)
                .with_context(|| format!("reading {}", local.display()))?;
            blocking_agent()
                .put(&url)
                .content_type("application/octet-stream")
                .send(&data[..])
                .with_context(|| format!("uploading to {}", url))?;
            Ok(url)
        })
        .await??;

        info!("artifact uploaded: {}", uploaded);
        Ok(uploaded)
    }
}

/// HTTP session store: posts the summary, receives the summarized record.
pub struct HttpSessionStore {
    endpoint: String,
}

impl HttpSessionStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpSessionStore { endpoint: endpoint.into() }
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn persist(&self, summary: SessionSummary) -> Result<SessionRecord> {
        let endpoint = self.endpoint.clone();

        let record = tokio::task::spawn_blocking(move || -> Result<SessionRecord> {
            let mut response = blocking_agent()
                .post(&endpoint)
                .send_json(&summary)
                .with_context(|| format!("persisting session to {}", endpoint))?;
            response
                .body_mut()
                .read_json::<SessionRecord>()
                .context("decoding session record")
        })
        .await??;

        info!("session persisted: id={} status={:?}", record.id, record.status);
        Ok(record)
    }
}
