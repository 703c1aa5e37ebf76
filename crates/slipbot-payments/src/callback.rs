//! STK push callback parsing.
//!
//! Daraja posts a JSON envelope to the callback URL once the subscriber
//! approves, cancels, or ignores the prompt on their phone:
//!
//! ```json
//! {"Body": {"stkCallback": {
//!     "ResultCode": 0,
//!     "AccountReference": "premium",
//!     "CallbackMetadata": {"Item": [
//!         {"Name": "Amount", "Value": 300},
//!         {"Name": "MpesaReceiptNumber", "Value": "QKX1..."},
//!         {"Name": "PhoneNumber", "Value": 254700000000}
//!     ]}
//! }}}
//! ```

use chrono::NaiveDate;
use serde_json::Value;
use slipbot_core::{
    entitlement::{PaidTier, PaymentEvent},
    error::SlipbotError,
    identity::SubscriberId,
};
use thiserror::Error;

/// Why a callback did not yield a payment event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("missing Body.stkCallback")]
    MissingEnvelope,

    /// The subscriber cancelled, the request timed out, or M-Pesa declined.
    #[error("payment not completed (ResultCode {code}): {description}")]
    PaymentFailed { code: i64, description: String },

    #[error("missing CallbackMetadata.Item")]
    MissingMetadata,

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid phone number {0:?}")]
    InvalidPhone(String),

    #[error("invalid amount {0}")]
    InvalidAmount(String),

    #[error("unknown account reference {0:?}")]
    UnknownAccountReference(String),
}

impl From<CallbackError> for SlipbotError {
    fn from(e: CallbackError) -> Self {
        SlipbotError::MalformedCallback(e.to_string())
    }
}

/// Turn a callback body into a payment event dated `confirmed_on`.
///
/// Only a successful callback whose account reference names a paid tier
/// produces an event; everything else is an error the caller logs and drops.
pub fn parse_stk_callback(
    body: &Value,
    confirmed_on: NaiveDate,
) -> Result<PaymentEvent, CallbackError> {
    let stk = body
        .pointer("/Body/stkCallback")
        .filter(|v| v.is_object())
        .ok_or(CallbackError::MissingEnvelope)?;

    if let Some(code) = stk.get("ResultCode").and_then(as_i64) {
        if code != 0 {
            let description = stk
                .get("ResultDesc")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(CallbackError::PaymentFailed { code, description });
        }
    }

    let items = stk
        .pointer("/CallbackMetadata/Item")
        .and_then(Value::as_array)
        .ok_or(CallbackError::MissingMetadata)?;

    let phone = item(items, "PhoneNumber")
        .and_then(scalar_string)
        .ok_or(CallbackError::MissingField("PhoneNumber"))?;
    let subscriber =
        SubscriberId::parse(&phone).map_err(|_| CallbackError::InvalidPhone(phone.clone()))?;

    let amount_value = item(items, "Amount").ok_or(CallbackError::MissingField("Amount"))?;
    let amount = as_amount(amount_value)
        .ok_or_else(|| CallbackError::InvalidAmount(amount_value.to_string()))?;

    let reference = stk
        .get("AccountReference")
        .or_else(|| item(items, "AccountReference"))
        .and_then(Value::as_str)
        .ok_or(CallbackError::MissingField("AccountReference"))?;
    let tier = PaidTier::from_account_reference(reference)
        .ok_or_else(|| CallbackError::UnknownAccountReference(reference.to_string()))?;

    let receipt = item(items, "MpesaReceiptNumber").and_then(scalar_string);

    Ok(PaymentEvent {
        subscriber,
        tier,
        amount,
        confirmed_on,
        receipt,
    })
}

fn item<'a>(items: &'a [Value], name: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|i| i.get("Name").and_then(Value::as_str) == Some(name))
        .and_then(|i| i.get("Value"))
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whole shillings. Daraja sends `300` or `300.00`.
fn as_amount(v: &Value) -> Option<u64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (f.is_finite() && f >= 0.0).then(|| f.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn success(items: Value, reference: Option<&str>) -> Value {
        let mut stk = json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResultCode": 0,
            "ResultDesc": "The service request is processed successfully.",
            "CallbackMetadata": {"Item": items}
        });
        if let Some(r) = reference {
            stk["AccountReference"] = json!(r);
        }
        json!({"Body": {"stkCallback": stk}})
    }

    #[test]
    fn test_premium_callback() {
        let body = success(
            json!([
                {"Name": "Amount", "Value": 300},
                {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                {"Name": "TransactionDate", "Value": 20261016102115u64},
                {"Name": "PhoneNumber", "Value": 254700000000u64}
            ]),
            Some("premium"),
        );
        let event = parse_stk_callback(&body, today()).unwrap();
        assert_eq!(event.subscriber.as_str(), "whatsapp:+254700000000");
        assert_eq!(event.tier, PaidTier::Premium);
        assert_eq!(event.amount, 300);
        assert_eq!(event.confirmed_on, today());
        assert_eq!(event.receipt.as_deref(), Some("NLJ7RT61SV"));
    }

    #[test]
    fn test_reference_from_item_and_string_values() {
        let body = success(
            json!([
                {"Name": "Amount", "Value": "150.00"},
                {"Name": "PhoneNumber", "Value": "254700000001"},
                {"Name": "AccountReference", "Value": "normal"}
            ]),
            None,
        );
        let event = parse_stk_callback(&body, today()).unwrap();
        assert_eq!(event.tier, PaidTier::Normal);
        assert_eq!(event.amount, 150);
        assert_eq!(event.receipt, None);
    }

    #[test]
    fn test_cancelled_payment() {
        let body = json!({"Body": {"stkCallback": {
            "ResultCode": 1032,
            "ResultDesc": "Request cancelled by user",
            "AccountReference": "premium"
        }}});
        assert_eq!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::PaymentFailed {
                code: 1032,
                description: "Request cancelled by user".into()
            }
        );
    }

    #[test]
    fn test_missing_metadata() {
        let body = json!({"Body": {"stkCallback": {"AccountReference": "normal"}}});
        assert_eq!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::MissingMetadata
        );
    }

    #[test]
    fn test_not_a_callback() {
        for body in [json!({}), json!({"Body": "x"}), json!([1, 2]), Value::Null] {
            assert_eq!(
                parse_stk_callback(&body, today()).unwrap_err(),
                CallbackError::MissingEnvelope
            );
        }
    }

    #[test]
    fn test_missing_phone() {
        let body = success(json!([{"Name": "Amount", "Value": 300}]), Some("premium"));
        assert_eq!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::MissingField("PhoneNumber")
        );
    }

    #[test]
    fn test_missing_reference() {
        let body = success(
            json!([
                {"Name": "Amount", "Value": 300},
                {"Name": "PhoneNumber", "Value": 254700000000u64}
            ]),
            None,
        );
        assert_eq!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::MissingField("AccountReference")
        );
    }

    #[test]
    fn test_reference_is_case_sensitive() {
        let body = success(
            json!([
                {"Name": "Amount", "Value": 300},
                {"Name": "PhoneNumber", "Value": 254700000000u64}
            ]),
            Some("Premium"),
        );
        assert_eq!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::UnknownAccountReference("Premium".into())
        );
    }

    #[test]
    fn test_bad_phone_and_amount() {
        let body = success(
            json!([
                {"Name": "Amount", "Value": 300},
                {"Name": "PhoneNumber", "Value": "n/a"}
            ]),
            Some("normal"),
        );
        assert!(matches!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::InvalidPhone(_)
        ));

        let body = success(
            json!([
                {"Name": "Amount", "Value": -5},
                {"Name": "PhoneNumber", "Value": 254700000000u64}
            ]),
            Some("normal"),
        );
        assert!(matches!(
            parse_stk_callback(&body, today()).unwrap_err(),
            CallbackError::InvalidAmount(_)
        ));
    }

    #[test]
    fn test_converts_to_malformed_callback() {
        let err: SlipbotError = CallbackError::MissingMetadata.into();
        assert!(matches!(err, SlipbotError::MalformedCallback(msg) if msg.contains("CallbackMetadata")));
    }
}
