//! Pose extraction collaborator
//!
//! Sends a stored video reference plus sport context to the extraction
//! service and turns the response into an immutable [`PoseFrameSet`]. The
//! service works from sparse, AI-supplied key frames; it is invoked on
//! demand for any completed recording, not only live sessions. Every frame
//! must carry all 17 canonical joints; any the service leaves out are
//! materialized as not-visible rather than omitted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pose::{Joint, JointName, PoseFrame, PoseFrameSet, Sport};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub video_path: String,
    pub sport_context: Sport,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFrameSet {
    frames: Vec<WireFrame>,
    fps: f32,
    total_frames: u32,
    duration: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFrame {
    frame_number: u32,
    timestamp: f64,
    joints: Vec<Joint>,
}

/// Fill in any canonical landmark the extractor failed to report.
fn complete_joints(mut joints: Vec<Joint>) -> Vec<Joint> {
    for name in JointName::ALL {
        if !joints.iter().any(|j| j.name == name) {
            joints.push(Joint::unresolved(name));
        }
    }
    joints
}

fn into_frame_set(wire: WireFrameSet) -> Result<PoseFrameSet> {
    let frames = wire
        .frames
        .into_iter()
        .map(|f| PoseFrame::new(f.frame_number, f.timestamp, complete_joints(f.joints)))
        .collect();
    PoseFrameSet::new(frames, wire.fps, wire.total_frames, wire.duration)
}

#[async_trait]
pub trait PoseExtractor: Send + Sync {
    async fn extract(&self, request: ExtractionRequest) -> Result<PoseFrameSet>;
}

/// HTTP client for the extraction service.
pub struct HttpPoseExtractor {
    endpoint: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpPoseExtractor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpPoseExtractor {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(10),
            // Extraction walks the whole clip; allow it time.
            read_timeout: Duration::from_secs(300),
        }
    }

    fn agent(&self) -> ureq::Agent {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(self.connect_timeout))
            .timeout_recv_body(Some(self.read_timeout))
            .build();
        ureq::Agent::new_with_config(config)
    }
}

#[async_trait]
impl PoseExtractor for HttpPoseExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<PoseFrameSet> {
        let endpoint = self.endpoint.clone();
        let agent = self.agent();

        info!("requesting pose extraction for {}", request.video_path);
        let wire: WireFrameSet = tokio::task::spawn_blocking(move || -> Result<WireFrameSet> {
            let mut response = agent
                .post(&endpoint)
                .send_json(&request)
                .with_context(|| format!("pose extraction call to {}", endpoint))?;
            response
                .body_mut()
                .read_json::<WireFrameSet>()
                .context("decoding pose extraction response")
        })
        .await??;

        let set = into_frame_set(wire)?;
        info!("extracted {} pose frames at {} fps", set.len(), set.fps);
        Ok(set)
    }
}
