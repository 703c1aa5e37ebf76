use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub twilio: Option<TwilioConfig>,
}

/// Twilio WhatsApp channel config.
///
/// Inbound messages arrive on `POST /webhook`; replies go out through the
/// Twilio Messages REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Bot's WhatsApp number, e.g. `+14155238886`.
    #[serde(default)]
    pub whatsapp_number: String,
    /// Operator phone that receives payment notices. Empty = no notices.
    #[serde(default)]
    pub admin_number: String,
    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            account_sid: String::new(),
            auth_token: String::new(),
            whatsapp_number: String::new(),
            admin_number: String::new(),
            base_url: default_twilio_base_url(),
        }
    }
}
