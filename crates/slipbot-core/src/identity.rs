//! Subscriber identity: the store key shared by the chat and payment flows.
//!
//! Twilio addresses a WhatsApp user as `whatsapp:+254700000000`, while M-Pesa
//! reports the paying phone as the bare MSISDN `254700000000`. Both must land on
//! the same record, so every identity is canonicalised to `whatsapp:+<digits>`.

use crate::error::SlipbotError;
use serde::{Deserialize, Serialize};
use std::fmt;

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Canonical, channel-qualified subscriber key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Parse a WhatsApp address or a bare phone number.
    ///
    /// Accepts `whatsapp:+2547…`, `+2547…` and `2547…`. Spaces and dashes are
    /// ignored; any other non-digit character is rejected.
    pub fn parse(raw: &str) -> Result<Self, SlipbotError> {
        let trimmed = raw.trim();
        let rest = trimmed.strip_prefix(WHATSAPP_PREFIX).unwrap_or(trimmed);
        let rest = rest.trim().strip_prefix('+').unwrap_or(rest.trim());

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                _ => return Err(SlipbotError::InvalidIdentity(raw.to_string())),
            }
        }

        if digits.is_empty() {
            return Err(SlipbotError::InvalidIdentity(raw.to_string()));
        }

        Ok(Self(format!("{WHATSAPP_PREFIX}+{digits}")))
    }

    /// The store key, e.g. `whatsapp:+254700000000`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bare digits, as the payment gateway expects them (`254700000000`).
    pub fn msisdn(&self) -> &str {
        &self.0[WHATSAPP_PREFIX.len() + 1..]
    }

    /// Address for outbound WhatsApp delivery.
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubscriberId {
    type Error = SlipbotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubscriberId> for String {
    fn from(id: SubscriberId) -> Self {
        id.0
    }
}
