//! Outbound message delivery.

use super::{TwilioChannel, MAX_BODY_CHARS};
use serde::Deserialize;
use slipbot_core::error::SlipbotError;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TwilioError {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioChannel {
    /// Send `text` to `to`, split into as many messages as the body limit needs.
    pub(crate) async fn send_text(&self, to: &str, text: &str) -> Result<(), SlipbotError> {
        if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
            return Err(SlipbotError::Channel(
                "twilio credentials not configured".into(),
            ));
        }

        let from = self.from_address();
        let url = self.messages_url();

        for chunk in split_message(text, MAX_BODY_CHARS) {
            debug!("twilio: sending {} chars to {to}", chunk.chars().count());
            let resp = self
                .client
                .post(&url)
                .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
                .form(&[("From", from.as_str()), ("To", to), ("Body", chunk)])
                .send()
                .await
                .map_err(|e| SlipbotError::Channel(format!("twilio send failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SlipbotError::Channel(format!(
                    "twilio returned {status}: {}",
                    describe_error(&body)
                )));
            }
        }
        Ok(())
    }
}

/// Pull Twilio's `code`/`message` out of an error body, or return it raw.
pub(crate) fn describe_error(body: &str) -> String {
    match serde_json::from_str::<TwilioError>(body) {
        Ok(TwilioError {
            code: Some(code),
            message: Some(message),
        }) => format!("{message} (code {code})"),
        _ => body.to_string(),
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring line
/// breaks. Never splits inside a UTF-8 sequence.
pub(crate) fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    if text.chars().count() <= max_chars {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let break_at = if end < rest.len() {
            rest[..end]
                .rfind('\n')
                .map(|i| i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&rest[..break_at]);
        rest = &rest[break_at..];
    }

    chunks
}
