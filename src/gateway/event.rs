//! Chat event data and the reply seam.
//!
//! The chat-gateway SDK itself is an external collaborator; the dispatch
//! layer only needs the event fields used to build job payloads, and a
//! [`ReplySink`] through which side effects flow back to the platform.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::UserId;

/// A chat message as delivered by the platform SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// The guild/server the message was sent in, if any (DMs have none).
    pub guild_id: Option<u64>,
    pub guild_name: Option<String>,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_id: UserId,
    /// The author's display name, used in prompt assembly.
    pub author_name: String,
    pub content: String,
}

/// A side-effect failure reported by the chat SDK.
#[derive(Debug, Error)]
#[error("reply sink error: {0}")]
pub struct SinkError(String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        SinkError(message.into())
    }
}

/// Send-side capabilities of the chat platform.
///
/// Implemented by the embedding chat process over its SDK. All methods are
/// best-effort from the dispatch layer's point of view: failures are logged,
/// never retried, never surfaced to end users.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Sends a message to a channel.
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<(), SinkError>;

    /// Sends a message as an explicit reply to an earlier message.
    async fn reply_to(
        &self,
        channel_id: u64,
        message_id: u64,
        text: &str,
    ) -> Result<(), SinkError>;

    /// Reports a message flagged by the safety classifier to moderators.
    async fn report_flagged(&self, event: &MessageEvent, verdict: &Value) -> Result<(), SinkError>;
}
