//! Ordered provider chain: the first provider that answers in time wins.

use async_trait::async_trait;
use slipbot_core::{error::SlipbotError, traits::AnswerProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tries each provider in order, each bounded by its own timeout.
pub struct FallbackChain {
    providers: Vec<Arc<dyn AnswerProvider>>,
    per_provider_timeout: Duration,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn AnswerProvider>>, per_provider_timeout: Duration) -> Self {
        Self {
            providers,
            per_provider_timeout,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names in the order they are tried.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl AnswerProvider for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    async fn respond(&self, text: &str) -> Result<String, SlipbotError> {
        for provider in &self.providers {
            match tokio::time::timeout(self.per_provider_timeout, provider.respond(text)).await {
                Ok(Ok(answer)) => {
                    info!("answer provided by {}", provider.name());
                    return Ok(answer);
                }
                Ok(Err(e)) => warn!("{} failed, trying next provider: {e}", provider.name()),
                Err(_) => warn!(
                    "{} timed out after {}s, trying next provider",
                    provider.name(),
                    self.per_provider_timeout.as_secs()
                ),
            }
        }
        Err(SlipbotError::Provider(
            "all answer providers failed".to_string(),
        ))
    }
}
