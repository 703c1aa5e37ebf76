//! M-Pesa Daraja STK push gateway.
//!
//! Each initiation fetches an OAuth token with the consumer key and secret,
//! then posts a `CustomerPayBillOnline` request. The outcome arrives later on
//! the callback URL.
//! Docs: <https://developer.safaricom.co.ke/APIs/MpesaExpressSimulate>

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slipbot_core::{
    config::MpesaConfig, entitlement::PaidTier, error::SlipbotError, traits::PaymentGateway,
};
use tracing::{debug, info, warn};

/// STK push gateway.
pub struct DarajaGateway {
    config: MpesaConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushRequest {
    business_short_code: String,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: u64,
    party_a: String,
    party_b: String,
    phone_number: String,
    #[serde(rename = "CallBackURL")]
    callback_url: String,
    account_reference: &'static str,
    transaction_desc: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushResponse {
    response_code: Option<String>,
    response_description: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
}

impl DarajaGateway {
    pub fn new(config: MpesaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Configured price of `tier` in whole shillings.
    pub fn amount_for(&self, tier: PaidTier) -> u64 {
        match tier {
            PaidTier::Normal => self.config.normal_amount,
            PaidTier::Premium => self.config.premium_amount,
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn access_token(&self) -> Result<String, SlipbotError> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.base_url()
        );
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await
            .map_err(|e| SlipbotError::Gateway(format!("mpesa token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SlipbotError::Gateway(format!(
                "mpesa token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SlipbotError::Gateway(format!("mpesa token parse failed: {e}")))?;
        Ok(token.access_token)
    }

    fn stk_request(&self, phone: &str, tier: PaidTier, now: DateTime<Utc>) -> StkPushRequest {
        let timestamp = stk_timestamp(now);
        StkPushRequest {
            business_short_code: self.config.shortcode.clone(),
            password: stk_password(&self.config.shortcode, &self.config.passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: self.amount_for(tier),
            party_a: phone.to_string(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone.to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: tier.account_reference(),
            transaction_desc: format!("{tier} Subscription"),
        }
    }
}

/// `YYYYMMDDHHMMSS`.
pub fn stk_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Base64 of shortcode, passkey, and timestamp concatenated.
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

#[async_trait]
impl PaymentGateway for DarajaGateway {
    fn name(&self) -> &str {
        "mpesa"
    }

    async fn initiate(&self, phone: &str, tier: PaidTier) -> Result<bool, SlipbotError> {
        let token = self.access_token().await?;
        let request = self.stk_request(phone, tier, Utc::now());
        let url = format!("{}/mpesa/stkpush/v1/processrequest", self.base_url());
        debug!("mpesa: STK push {tier} for {phone} ({} KES)", request.amount);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| SlipbotError::Gateway(format!("mpesa stk push failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("mpesa: stk push rejected with {status}: {body}");
            return Ok(false);
        }

        let parsed: StkPushResponse = resp
            .json()
            .await
            .map_err(|e| SlipbotError::Gateway(format!("mpesa stk response parse failed: {e}")))?;

        let accepted = parsed.response_code.as_deref() == Some("0");
        if accepted {
            info!(
                "mpesa: STK push accepted for {phone} (checkout {})",
                parsed.checkout_request_id.as_deref().unwrap_or("?")
            );
        } else {
            warn!(
                "mpesa: STK push not accepted: {}",
                parsed.response_description.as_deref().unwrap_or("no description")
            );
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> MpesaConfig {
        MpesaConfig {
            consumer_key: "key".into(),
            consumer_secret: "secret".into(),
            shortcode: "174379".into(),
            passkey: "pk".into(),
            callback_url: "https://bot.example.com/mpesa-callback".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 7, 5, 9).unwrap();
        assert_eq!(stk_timestamp(now), "20261016070509");
    }

    #[test]
    fn test_password_is_base64_of_concatenation() {
        let password = stk_password("174379", "pk", "20261016070509");
        let decoded = STANDARD.decode(password).unwrap();
        assert_eq!(decoded, b"174379pk20261016070509");
    }

    #[test]
    fn test_default_amounts() {
        let gw = DarajaGateway::new(config());
        assert_eq!(gw.name(), "mpesa");
        assert_eq!(gw.amount_for(PaidTier::Normal), 150);
        assert_eq!(gw.amount_for(PaidTier::Premium), 300);
    }

    #[test]
    fn test_stk_request_body() {
        let gw = DarajaGateway::new(config());
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 7, 5, 9).unwrap();
        let body = serde_json::to_value(gw.stk_request("254700000000", PaidTier::Premium, now))
            .unwrap();

        assert_eq!(body["BusinessShortCode"], "174379");
        assert_eq!(body["Timestamp"], "20261016070509");
        assert_eq!(body["TransactionType"], "CustomerPayBillOnline");
        assert_eq!(body["Amount"], 300);
        assert_eq!(body["PartyA"], "254700000000");
        assert_eq!(body["PartyB"], "174379");
        assert_eq!(body["PhoneNumber"], "254700000000");
        assert_eq!(body["CallBackURL"], "https://bot.example.com/mpesa-callback");
        assert_eq!(body["AccountReference"], "premium");
        assert_eq!(body["TransactionDesc"], "premium Subscription");
        assert_eq!(
            body["Password"],
            stk_password("174379", "pk", "20261016070509")
        );
    }

    #[test]
    fn test_stk_response_parsing() {
        let json = r#"{"MerchantRequestID":"29115-34620561-1","CheckoutRequestID":"ws_CO_1","ResponseCode":"0","ResponseDescription":"Success. Request accepted for processing","CustomerMessage":"Success"}"#;
        let resp: StkPushResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.response_code.as_deref(), Some("0"));
        assert_eq!(resp.checkout_request_id.as_deref(), Some("ws_CO_1"));
    }
}
