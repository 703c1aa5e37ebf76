//! Twilio WhatsApp channel.
//!
//! Inbound messages arrive as form posts on the bot's webhook; replies go out
//! through the Messages REST API.
//! Docs: <https://www.twilio.com/docs/messaging/api/message-resource>

mod inbound;
mod send;

#[cfg(test)]
mod tests;

pub use inbound::InboundForm;

use async_trait::async_trait;
use slipbot_core::{
    config::TwilioConfig, error::SlipbotError, message::OutgoingMessage,
    traits::NotificationChannel,
};

/// Twilio's per-message body limit.
pub(crate) const MAX_BODY_CHARS: usize = 1600;

/// WhatsApp channel backed by the Twilio REST API.
pub struct TwilioChannel {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioChannel {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// `whatsapp:+<digits>` address of the bot itself.
    pub fn from_address(&self) -> String {
        whatsapp_address(&self.config.whatsapp_number)
    }

    /// Operator address for payment notices, if configured.
    pub fn admin_address(&self) -> Option<String> {
        let admin = self.config.admin_number.trim();
        (!admin.is_empty()).then(|| whatsapp_address(admin))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

/// Prefix a phone number with `whatsapp:` unless it already has it.
pub fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

#[async_trait]
impl NotificationChannel for TwilioChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), SlipbotError> {
        let to = message
            .reply_target
            .as_deref()
            .ok_or_else(|| SlipbotError::Channel("no reply_target on outgoing message".into()))?;

        self.send_text(&whatsapp_address(to), &message.text).await
    }
}
