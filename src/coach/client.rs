//! Streaming coaching session client
//!
//! The session is an explicit object with connect/disconnect rather than
//! ambient global state. Outbound media goes through a channel-backed
//! sender; inbound feedback is surfaced on its own channel so consuming it
//! can never block the sample-push loop.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::Message;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::feedback::FeedbackKind;

use super::messages::{ClientMessage, ServerMessage};

/// One coaching remark as it arrives off the wire, before elapsed-time
/// tagging.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEvent {
    pub text: String,
    pub kind: FeedbackKind,
}

/// Cloneable outbound half of a coaching session.
#[derive(Clone)]
pub struct CoachSender {
    outbound: mpsc::Sender<ClientMessage>,
}

impl CoachSender {
    pub async fn send_image(&self, jpeg: Bytes) -> Result<()> {
        self.outbound
            .send(ClientMessage::image(&jpeg))
            .await
            .map_err(|_| anyhow!("coach session closed"))
    }

    pub async fn send_audio(&self, pcm: Bytes) -> Result<()> {
        self.outbound
            .send(ClientMessage::audio(&pcm))
            .await
            .map_err(|_| anyhow!("coach session closed"))
    }
}

/// A connected coaching session.
pub struct CoachHandle {
    outbound: mpsc::Sender<ClientMessage>,
    feedback: Option<mpsc::Receiver<FeedbackEvent>>,
}

impl CoachHandle {
    /// Assemble a handle from raw channels. Transport implementations and
    /// test doubles both build handles this way.
    pub fn from_channels(
        outbound: mpsc::Sender<ClientMessage>,
        feedback: mpsc::Receiver<FeedbackEvent>,
    ) -> Self {
        CoachHandle { outbound, feedback: Some(feedback) }
    }

    pub fn sender(&self) -> CoachSender {
        CoachSender { outbound: self.outbound.clone() }
    }

    /// The inbound feedback stream. Yields once; the orchestrator owns it
    /// afterwards.
    pub fn take_feedback(&mut self) -> Option<mpsc::Receiver<FeedbackEvent>> {
        self.feedback.take()
    }

    /// Request a graceful disconnect.
    pub async fn disconnect(self) {
        let _ = self.outbound.send(ClientMessage::Close).await;
    }
}

/// Establishes coaching sessions against some backend.
#[async_trait]
pub trait CoachConnector: Send + Sync {
    /// Connect and complete the setup handshake with the given system
    /// persona. The returned handle's streams end when `cancel` fires.
    async fn connect(&self, persona: &str, cancel: CancellationToken) -> Result<CoachHandle>;
}

/// Websocket transport for the coaching backend.
pub struct WsCoachConnector {
    url: String,
    handshake_timeout: Duration,
}

impl WsCoachConnector {
    pub fn new(url: impl Into<String>) -> Self {
        WsCoachConnector { url: url.into(), handshake_timeout: Duration::from_secs(10) }
    }
}

#[async_trait]
impl CoachConnector for WsCoachConnector {
    async fn connect(&self, persona: &str, cancel: CancellationToken) -> Result<CoachHandle> {
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("connecting to {}", self.url))?;
        let (mut sink, mut stream) = ws.split();

        let setup = ClientMessage::Setup { system_instruction: persona.to_string() };
        sink.send(Message::text(serde_json::to_string(&setup)?))
            .await
            .context("sending setup")?;

        // The session is not usable until the backend acknowledges setup.
        let ack = tokio::time::timeout(self.handshake_timeout, stream.next())
            .await
            .context("handshake timed out")?;
        match ack {
            Some(Ok(Message::Text(raw))) => match serde_json::from_str::<ServerMessage>(&raw)? {
                ServerMessage::SetupComplete => {}
                other => bail!("unexpected handshake reply: {:?}", other),
            },
            Some(Ok(other)) => bail!("unexpected handshake frame: {:?}", other),
            Some(Err(e)) => return Err(e).context("handshake failed"),
            None => bail!("backend closed during handshake"),
        }
        info!("coaching session established");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientMessage>(256);
        let (feedback_tx, feedback_rx) = mpsc::channel::<FeedbackEvent>(256);

        // Writer: serialize outbound messages until Close or cancellation.
        let write_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    msg = outbound_rx.recv() => {
                        let Some(msg) = msg else { break };
                        let closing = matches!(msg, ClientMessage::Close);
                        let raw = match serde_json::to_string(&msg) {
                            Ok(raw) => raw,
                            Err(e) => {
                                warn!("dropping unserializable message: {}", e);
                                continue;
                            }
                        };
                        if sink.send(Message::text(raw)).await.is_err() {
                            break;
                        }
                        if closing {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
            }
            let _ = sink.close(None).await;
            debug!("coach writer stopped");
        });

        // Reader: forward content events onto the feedback channel.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    frame = stream.next() => {
                        let Some(Ok(frame)) = frame else { break };
                        let Message::Text(raw) = frame else { continue };
                        match serde_json::from_str::<ServerMessage>(&raw) {
                            Ok(ServerMessage::Content { text, kind }) => {
                                if feedback_tx.send(FeedbackEvent { text, kind }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(ServerMessage::SetupComplete) => {}
                            Err(e) => warn!("ignoring malformed server message: {}", e),
                        }
                    }
                }
            }
            debug!("coach reader stopped");
        });

        Ok(CoachHandle::from_channels(outbound_tx, feedback_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sender_fails_after_handle_dropped() {
        let (outbound_tx, outbound_rx) = mpsc::channel(4);
        let (_feedback_tx, feedback_rx) = mpsc::channel(4);
        let handle = CoachHandle::from_channels(outbound_tx, feedback_rx);
        let sender = handle.sender();

        drop(handle);
        drop(outbound_rx);
        assert!(sender.send_audio(Bytes::from_static(&[0])).await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_sends_close() {
        let (outbound_tx, mut outbound_rx) = mpsc::channel(4);
        let (_feedback_tx, feedback_rx) = mpsc::channel(4);
        let handle = CoachHandle::from_channels(outbound_tx, feedback_rx);

        handle.disconnect().await;
        assert_eq!(outbound_rx.recv().await, Some(ClientMessage::Close));
    }

    #[tokio::test]
    async fn test_feedback_taken_once() {
        let (outbound_tx, _outbound_rx) = mpsc::channel(4);
        let (_feedback_tx, feedback_rx) = mpsc::channel(4);
        let mut handle = CoachHandle::from_channels(outbound_tx, feedback_rx);

        assert!(handle.take_feedback().is_some());
        assert!(handle.take_feedback().is_none());
    }
}
