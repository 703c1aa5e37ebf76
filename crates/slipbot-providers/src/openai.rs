//! OpenAI-compatible chat-completions provider.
//!
//! Serves both OpenAI and xAI (Grok), which speak the same protocol and differ
//! only in base URL, key, and model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slipbot_core::{
    config::{OpenAiConfig, XaiConfig},
    error::SlipbotError,
    traits::AnswerProvider,
};
use std::time::Instant;
use tracing::debug;

/// OpenAI-compatible provider.
pub struct OpenAiCompatProvider {
    name: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl OpenAiCompatProvider {
    /// Create from raw values.
    pub fn from_config(
        name: impl Into<String>,
        base_url: String,
        api_key: String,
        model: String,
        system_prompt: String,
    ) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            system_prompt,
        }
    }

    pub fn openai(cfg: &OpenAiConfig, system_prompt: &str) -> Self {
        Self::from_config(
            "openai",
            cfg.base_url.clone(),
            cfg.api_key.clone(),
            cfg.model.clone(),
            system_prompt.to_string(),
        )
    }

    pub fn xai(cfg: &XaiConfig, system_prompt: &str) -> Self {
        Self::from_config(
            "xai",
            cfg.base_url.clone(),
            cfg.api_key.clone(),
            cfg.model.clone(),
            system_prompt.to_string(),
        )
    }

    fn request_body(&self, text: &str) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });
        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

/// First non-empty choice, if any.
fn first_content(resp: &ChatCompletionResponse) -> Option<&str> {
    resp.choices
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .map(|m| m.content.trim())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl AnswerProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, text: &str) -> Result<String, SlipbotError> {
        if self.api_key.is_empty() {
            return Err(SlipbotError::Provider(format!(
                "{}: no API key configured",
                self.name
            )));
        }

        let start = Instant::now();
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("{}: POST {url} model={}", self.name, self.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| SlipbotError::Provider(format!("{} request failed: {e}", self.name)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SlipbotError::Provider(format!(
                "{} returned {status}: {body}",
                self.name
            )));
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            SlipbotError::Provider(format!("{}: failed to parse response: {e}", self.name))
        })?;

        let answer = first_content(&parsed)
            .map(str::to_string)
            .ok_or_else(|| SlipbotError::Provider(format!("{}: empty response", self.name)))?;

        debug!(
            "{}: answered in {}ms",
            self.name,
            start.elapsed().as_millis()
        );
        Ok(answer)
    }
}
