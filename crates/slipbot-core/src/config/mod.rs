mod channels;
mod defaults;
mod providers;


pub use channels::*;
pub use providers::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::SlipbotError;
use defaults::*;

/// Top-level Slipbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub entitlements: EntitlementConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub slips: SlipsConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Entitlement store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `"json"` (single human-readable file) or `"sqlite"`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// JSON backend file.
    #[serde(default = "default_store_path")]
    pub path: String,
    /// SQLite backend database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            db_path: default_db_path(),
        }
    }
}

/// Subscription window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementConfig {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

/// HTTP server hosting the chat webhook and the payment callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

/// Tips content served per tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlipsConfig {
    #[serde(default = "default_free_slip")]
    pub free: String,
    #[serde(default = "default_normal_slip")]
    pub normal: String,
    #[serde(default = "default_premium_slip")]
    pub premium: String,
}

impl Default for SlipsConfig {
    fn default() -> Self {
        Self {
            free: default_free_slip(),
            normal: default_normal_slip(),
            premium: default_premium_slip(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

impl Config {
    /// Fill secrets and deployment settings from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.provider.openai.get_or_insert_with(Default::default).api_key = v;
        }
        if let Some(v) = get("XAI_API_KEY") {
            self.provider.xai.get_or_insert_with(Default::default).api_key = v;
        }

        let twilio_keys = [
            "TWILIO_SID",
            "TWILIO_AUTH",
            "TWILIO_WHATSAPP_NUMBER",
            "ADMIN_NUMBER",
        ];
        if twilio_keys.iter().any(|k| get(k).is_some()) {
            let tw = self.channel.twilio.get_or_insert_with(Default::default);
            if let Some(v) = get("TWILIO_SID") {
                tw.account_sid = v;
            }
            if let Some(v) = get("TWILIO_AUTH") {
                tw.auth_token = v;
            }
            if let Some(v) = get("TWILIO_WHATSAPP_NUMBER") {
                tw.whatsapp_number = v;
            }
            if let Some(v) = get("ADMIN_NUMBER") {
                tw.admin_number = v;
            }
        }

        let mpesa_keys = [
            "MPESA_CONSUMER_KEY",
            "MPESA_CONSUMER_SECRET",
            "MPESA_SHORTCODE",
            "MPESA_PASSKEY",
            "MPESA_CALLBACK_URL",
        ];
        if mpesa_keys.iter().any(|k| get(k).is_some()) {
            let mp = self.payments.mpesa.get_or_insert_with(Default::default);
            if let Some(v) = get("MPESA_CONSUMER_KEY") {
                mp.consumer_key = v;
            }
            if let Some(v) = get("MPESA_CONSUMER_SECRET") {
                mp.consumer_secret = v;
            }
            if let Some(v) = get("MPESA_SHORTCODE") {
                mp.shortcode = v;
            }
            if let Some(v) = get("MPESA_PASSKEY") {
                mp.passkey = v;
            }
            if let Some(v) = get("MPESA_CALLBACK_URL") {
                mp.callback_url = v;
            }
        }

        if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
            self.api.port = port;
        }
    }

    /// Reject settings no request could ever succeed with.
    pub fn validate(&self) -> Result<(), SlipbotError> {
        if self.entitlements.window_days <= 0 {
            return Err(SlipbotError::Config(format!(
                "entitlements.window_days must be positive, got {}",
                self.entitlements.window_days
            )));
        }
        match self.store.backend.as_str() {
            "json" | "sqlite" => Ok(()),
            other => Err(SlipbotError::Config(format!(
                "unknown store backend '{other}', expected 'json' or 'sqlite'"
            ))),
        }
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, SlipbotError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SlipbotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| SlipbotError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
