use crate::{
    entitlement::{PaidTier, Tier},
    error::SlipbotError,
    message::OutgoingMessage,
};
use async_trait::async_trait;

/// Answer provider: free-text replies for anything outside the command grammar.
///
/// Every language-model backend implements this trait; a fallback chain of
/// providers implements it too.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Produce a reply to a user's free-text message.
    async fn respond(&self, text: &str) -> Result<String, SlipbotError>;
}

/// Payment gateway: asks the user's phone to approve a subscription charge.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Human-readable gateway name.
    fn name(&self) -> &str;

    /// Start a payment for `tier` from `phone` (bare MSISDN digits).
    ///
    /// `Ok(true)` means the upstream accepted the request; confirmation arrives
    /// later through the payment callback. `Ok(false)` means it was rejected.
    async fn initiate(&self, phone: &str, tier: PaidTier) -> Result<bool, SlipbotError>;
}

/// Notification channel: outbound messages to subscribers and the admin.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Deliver a message to `message.reply_target`.
    async fn send(&self, message: OutgoingMessage) -> Result<(), SlipbotError>;
}

/// Source of the day's tips content for a tier.
#[async_trait]
pub trait SlipSource: Send + Sync {
    async fn slip(&self, tier: Tier) -> Result<String, SlipbotError>;
}
