//! Streaming coaching session: wire types and client

pub mod client;
pub mod messages;

pub use client::{CoachConnector, CoachHandle, CoachSender, FeedbackEvent, WsCoachConnector};
pub use messages::{ClientMessage, ServerMessage};
