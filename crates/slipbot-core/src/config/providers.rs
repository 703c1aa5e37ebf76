use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Answer provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Per-provider call timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
    /// Providers tried in order until one answers.
    #[serde(default = "default_provider_chain")]
    pub chain: Vec<String>,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    pub openai: Option<OpenAiConfig>,
    pub xai: Option<XaiConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout_secs(),
            chain: default_provider_chain(),
            system_prompt: default_system_prompt(),
            openai: None,
            xai: None,
        }
    }
}

/// OpenAI provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: default_openai_model(),
            base_url: default_openai_base_url(),
        }
    }
}

/// xAI (Grok) provider config. Speaks the OpenAI chat-completions protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XaiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_xai_model")]
    pub model: String,
    #[serde(default = "default_xai_base_url")]
    pub base_url: String,
}

impl Default for XaiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: default_xai_model(),
            base_url: default_xai_base_url(),
        }
    }
}

/// Payment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// Timeout for a payment initiation, token fetch included.
    #[serde(default = "default_payments_timeout_secs")]
    pub timeout_secs: u64,
    pub mpesa: Option<MpesaConfig>,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_payments_timeout_secs(),
            mpesa: None,
        }
    }
}

/// M-Pesa Daraja (STK push) config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub shortcode: String,
    #[serde(default)]
    pub passkey: String,
    /// Public URL of `POST /mpesa-callback`.
    #[serde(default)]
    pub callback_url: String,
    /// When set, callbacks must carry `?token=<value>` or they are ignored.
    #[serde(default)]
    pub callback_token: String,
    #[serde(default = "default_mpesa_base_url")]
    pub base_url: String,
    #[serde(default = "default_normal_amount")]
    pub normal_amount: u64,
    #[serde(default = "default_premium_amount")]
    pub premium_amount: u64,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            consumer_key: String::new(),
            consumer_secret: String::new(),
            shortcode: String::new(),
            passkey: String::new(),
            callback_url: String::new(),
            callback_token: String::new(),
            base_url: default_mpesa_base_url(),
            normal_amount: default_normal_amount(),
            premium_amount: default_premium_amount(),
        }
    }
}
