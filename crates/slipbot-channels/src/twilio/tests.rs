use super::send::{describe_error, split_message};
use super::*;
use slipbot_core::message::OutgoingMessage;

fn config() -> TwilioConfig {
    TwilioConfig {
        account_sid: "AC123".into(),
        auth_token: "secret".into(),
        whatsapp_number: "+14155238886".into(),
        admin_number: "+254711000000".into(),
        ..Default::default()
    }
}

#[test]
fn test_addresses() {
    let ch = TwilioChannel::new(config());
    assert_eq!(ch.name(), "whatsapp");
    assert_eq!(ch.from_address(), "whatsapp:+14155238886");
    assert_eq!(ch.admin_address().as_deref(), Some("whatsapp:+254711000000"));
    assert_eq!(
        ch.messages_url(),
        "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
    );
}

#[test]
fn test_no_admin_configured() {
    let ch = TwilioChannel::new(TwilioConfig {
        admin_number: "  ".into(),
        ..config()
    });
    assert_eq!(ch.admin_address(), None);
}

#[test]
fn test_whatsapp_address_is_not_doubled() {
    assert_eq!(whatsapp_address("whatsapp:+2547"), "whatsapp:+2547");
    assert_eq!(whatsapp_address("+2547"), "whatsapp:+2547");
}

#[test]
fn test_split_short_message() {
    assert_eq!(split_message("hello", MAX_BODY_CHARS), vec!["hello"]);
}

#[test]
fn test_split_prefers_line_breaks() {
    let text = "tip line\n".repeat(400);
    let chunks = split_message(&text, MAX_BODY_CHARS);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= MAX_BODY_CHARS);
        assert!(chunk.ends_with('\n'));
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_split_multibyte_without_newlines() {
    let text = "⚽".repeat(3500);
    let chunks = split_message(&text, MAX_BODY_CHARS);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chars().count(), MAX_BODY_CHARS);
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_describe_error() {
    let body = r#"{"code":21211,"message":"Invalid 'To' Phone Number","status":400}"#;
    assert_eq!(describe_error(body), "Invalid 'To' Phone Number (code 21211)");
    assert_eq!(describe_error("gateway down"), "gateway down");
}

#[tokio::test]
async fn test_send_without_target_fails() {
    let ch = TwilioChannel::new(config());
    let err = ch.send(OutgoingMessage::default()).await.unwrap_err();
    assert!(matches!(err, SlipbotError::Channel(_)));
}

#[tokio::test]
async fn test_send_without_credentials_fails_fast() {
    let ch = TwilioChannel::new(TwilioConfig::default());
    let err = ch
        .send(OutgoingMessage::to("whatsapp:+254700000000", "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, SlipbotError::Channel(msg) if msg.contains("credentials")));
}

#[test]
fn test_inbound_form_into_incoming() {
    let form: InboundForm = serde_json::from_value(serde_json::json!({
        "From": "whatsapp:+254700000000",
        "Body": "Todays Paid Tips",
        "ProfileName": "Wanjiku",
        "MessageSid": "SM1"
    }))
    .unwrap();
    let incoming = form.into_incoming();
    assert_eq!(incoming.channel, "whatsapp");
    assert_eq!(incoming.sender_id, "whatsapp:+254700000000");
    assert_eq!(incoming.text, "Todays Paid Tips");
    assert_eq!(incoming.sender_name.as_deref(), Some("Wanjiku"));
    assert_eq!(incoming.platform_id.as_deref(), Some("SM1"));
}

#[test]
fn test_inbound_form_missing_body_is_empty() {
    let form: InboundForm =
        serde_json::from_value(serde_json::json!({"From": "whatsapp:+254700000000"})).unwrap();
    assert_eq!(form.into_incoming().text, "");
}
