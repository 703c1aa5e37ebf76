use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming chat message from a channel webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "whatsapp").
    pub channel: String,
    /// Platform-specific sender address (e.g. `whatsapp:+254700000000`).
    pub sender_id: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    /// When the webhook delivered it.
    pub received_at: DateTime<Utc>,
    /// Platform message id (e.g. Twilio `MessageSid`), for log correlation.
    #[serde(default)]
    pub platform_id: Option<String>,
}

impl IncomingMessage {
    /// Build a message received just now.
    pub fn new(channel: &str, sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            text: text.to_string(),
            received_at: Utc::now(),
            platform_id: None,
        }
    }
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
    /// Platform-specific target for routing (e.g. `whatsapp:+254700000000`).
    #[serde(default)]
    pub reply_target: Option<String>,
}

impl OutgoingMessage {
    pub fn to(target: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: MessageMetadata::default(),
            reply_target: Some(target.to_string()),
        }
    }
}

/// Metadata about how a reply was produced.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which answer provider produced this reply, if any.
    pub provider_used: Option<String>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}
