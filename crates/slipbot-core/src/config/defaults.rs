//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Slipbot".to_string()
}

pub fn default_data_dir() -> String {
    "~/.slipbot".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_store_backend() -> String {
    "json".to_string()
}

pub fn default_store_path() -> String {
    "~/.slipbot/data/users.json".to_string()
}

pub fn default_db_path() -> String {
    "~/.slipbot/data/entitlements.db".to_string()
}

pub fn default_window_days() -> i64 {
    crate::expiry::DEFAULT_WINDOW_DAYS
}

pub fn default_provider_timeout_secs() -> u64 {
    30
}

pub fn default_provider_chain() -> Vec<String> {
    vec!["openai".to_string(), "xai".to_string()]
}

pub fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_xai_model() -> String {
    "grok-2-latest".to_string()
}

pub fn default_xai_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

pub fn default_twilio_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

pub fn default_payments_timeout_secs() -> u64 {
    20
}

pub fn default_mpesa_base_url() -> String {
    "https://sandbox.safaricom.co.ke".to_string()
}

pub fn default_normal_amount() -> u64 {
    150
}

pub fn default_premium_amount() -> u64 {
    300
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    3000
}

pub fn default_free_slip() -> String {
    "🟢 Free User: Here is today's safe tip...".to_string()
}

pub fn default_normal_slip() -> String {
    "🟡 Normal Paid Tips: Here is today's paid slip...".to_string()
}

pub fn default_premium_slip() -> String {
    "🔵 Premium Tips: Here are today's premium slips...".to_string()
}
