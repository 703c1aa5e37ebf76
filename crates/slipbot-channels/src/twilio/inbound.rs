//! Twilio webhook form payload.

use serde::Deserialize;
use slipbot_core::message::IncomingMessage;

/// Fields Twilio posts for an inbound WhatsApp message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "ProfileName", default)]
    pub profile_name: Option<String>,
    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,
}

impl InboundForm {
    pub fn into_incoming(self) -> IncomingMessage {
        let mut incoming = IncomingMessage::new("whatsapp", &self.from, &self.body);
        incoming.sender_name = self.profile_name.filter(|n| !n.trim().is_empty());
        incoming.platform_id = self.message_sid;
        incoming
    }
}
