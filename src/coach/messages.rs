//! Wire types for the streaming coaching session

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::{AUDIO_MIME, IMAGE_MIME};
use crate::session::feedback::FeedbackKind;

/// Outbound messages: the initial persona setup, then media samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Setup { system_instruction: String },
    #[serde(rename_all = "camelCase")]
    Media { mime_type: String, data: String },
    Close,
}

impl ClientMessage {
    /// A once-per-second JPEG still.
    pub fn image(jpeg: &[u8]) -> Self {
        ClientMessage::Media {
            mime_type: IMAGE_MIME.to_string(),
            data: BASE64.encode(jpeg),
        }
    }

    /// A 16 kHz mono s16 audio chunk, pushed as produced.
    pub fn audio(pcm: &[u8]) -> Self {
        ClientMessage::Media {
            mime_type: AUDIO_MIME.to_string(),
            data: BASE64.encode(pcm),
        }
    }
}

/// Inbound messages: handshake acknowledgement and asynchronous content
/// events carrying coaching text fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    SetupComplete,
    #[serde(rename_all = "camelCase")]
    Content {
        text: String,
        #[serde(default)]
        kind: FeedbackKind,
    },
}
