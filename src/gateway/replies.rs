//! Reply templates.

use chrono::{DateTime, Utc};
use slipbot_core::entitlement::{PaidTier, Tier};

/// Weekly price per paid tier, in shillings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prices {
    pub normal: u64,
    pub premium: u64,
}

impl Prices {
    pub fn of(&self, tier: PaidTier) -> u64 {
        match tier {
            PaidTier::Normal => self.normal,
            PaidTier::Premium => self.premium,
        }
    }
}

pub fn rules_reminder(bot_name: &str) -> String {
    format!(
        "Welcome to {bot_name}!\n\n\
         Before we start, please read our rules:\n\
         1. Tips are predictions, not guarantees. Bet responsibly.\n\
         2. Subscriptions last 7 days from the day of payment.\n\
         3. Payments are made through M-Pesa and are non-refundable.\n\n\
         Reply ACCEPT to continue."
    )
}

pub fn menu(prices: &Prices) -> String {
    format!(
        "Here is what I can do:\n\
         • todays safe tips (free)\n\
         • todays paid tips (Normal)\n\
         • todays premium tips (Premium)\n\
         • subscribe normal (Ksh {}/week)\n\
         • subscribe premium (Ksh {}/week)\n\n\
         Anything else, just ask.",
        prices.normal, prices.premium
    )
}

pub fn welcome(bot_name: &str, prices: &Prices) -> String {
    format!("Thanks for accepting the rules. Welcome to {bot_name}!\n\n{}", menu(prices))
}

pub fn upsell(tier: PaidTier, prices: &Prices) -> String {
    match tier {
        PaidTier::Normal => format!(
            "To access paid tips, please subscribe to Normal (Ksh {}/week).",
            prices.normal
        ),
        PaidTier::Premium => format!(
            "Premium tips require Premium subscription (Ksh {}/week).",
            prices.premium
        ),
    }
}

pub fn payment_initiated(tier: PaidTier) -> String {
    format!(
        "💳 {} subscription initiated. Complete payment on your phone.",
        tier.account_reference().to_uppercase()
    )
}

pub const PAYMENT_FAILED: &str = "Payment request failed. Try again.";

pub const ANSWERS_UNAVAILABLE: &str = "AI service temporarily unavailable. Please try again later.";

pub const SLIPS_UNAVAILABLE: &str = "Today's tips are not ready yet. Please check back shortly.";

pub const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable. Please try again shortly.";

pub fn admin_payment_notice(msisdn: &str, amount: u64, tier: PaidTier) -> String {
    format!("💰 Payment received from {msisdn} - Ksh {amount} - {tier}")
}

pub fn subscription_confirmed(tier: Tier, until: DateTime<Utc>) -> String {
    let name = match tier {
        Tier::Premium => "Premium",
        Tier::Normal => "Normal",
        Tier::Free => "Free",
    };
    format!(
        "✅ Payment received. Your {name} subscription is active until {}.",
        until.format("%Y-%m-%d %H:%M UTC")
    )
}
