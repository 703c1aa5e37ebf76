//! Payment callback dispatch.

use super::replies;
use super::Gateway;
use chrono::{DateTime, Utc};
use serde_json::Value;
use slipbot_core::{
    entitlement::{EntitlementRecord, PaidTier, PaymentEvent},
    expiry::expires_at,
    message::OutgoingMessage,
};
use slipbot_payments::parse_stk_callback;
use tracing::{error, info, warn};

/// What a callback did. The transport acknowledges in every case.
#[derive(Debug)]
pub enum CallbackOutcome {
    Granted(PaymentEvent),
    /// Malformed, failed, or irrelevant; nothing was changed.
    Ignored(String),
    /// The grant could not be persisted.
    StoreFailed(String),
}

impl Gateway {
    /// Apply a payment callback body, dated today.
    pub async fn handle_payment_callback(&self, body: &Value) -> CallbackOutcome {
        self.handle_payment_callback_at(body, Utc::now()).await
    }

    pub(crate) async fn handle_payment_callback_at(
        &self,
        body: &Value,
        now: DateTime<Utc>,
    ) -> CallbackOutcome {
        let event = match parse_stk_callback(body, now.date_naive()) {
            Ok(event) => event,
            Err(e) => {
                warn!("payment callback ignored: {e}");
                return CallbackOutcome::Ignored(e.to_string());
            }
        };

        let expected = self.prices.of(event.tier);
        if event.amount != expected {
            warn!(
                "payment from {} for {} was Ksh {}, expected Ksh {expected}",
                event.subscriber, event.tier, event.amount
            );
        }

        let confirmed = match self.machine.on_payment_confirmed(&event).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                error!(
                    "failed to record {} payment for {} (receipt {}): {e}",
                    event.tier,
                    event.subscriber,
                    event.receipt.as_deref().unwrap_or("none")
                );
                return CallbackOutcome::StoreFailed(e.to_string());
            }
        };

        if !confirmed.changed {
            info!(
                "payment callback replayed: {} {} receipt {}, notices already sent",
                event.subscriber,
                event.tier,
                event.receipt.as_deref().unwrap_or("none")
            );
            return CallbackOutcome::Granted(event);
        }

        info!(
            "payment confirmed: {} {} Ksh {} receipt {}",
            event.subscriber,
            event.tier,
            event.amount,
            event.receipt.as_deref().unwrap_or("none")
        );
        self.spawn_payment_notices(&event, &confirmed.record, now);
        CallbackOutcome::Granted(event)
    }

    /// Tell the operator and the subscriber, without delaying the acknowledgement.
    fn spawn_payment_notices(
        &self,
        event: &PaymentEvent,
        record: &EntitlementRecord,
        now: DateTime<Utc>,
    ) {
        let mut notices = Vec::with_capacity(2);

        if let Some(admin) = &self.admin_target {
            notices.push(OutgoingMessage::to(
                admin,
                replies::admin_payment_notice(event.subscriber.msisdn(), event.amount, event.tier),
            ));
        }

        let tier = self.machine.derive_effective_tier(record, now);
        let grant = match event.tier {
            PaidTier::Premium => record.premium_grant,
            PaidTier::Normal => record.normal_grant,
        };
        if let Some(grant) = grant {
            let until = expires_at(grant.granted_on, self.machine.window_days());
            notices.push(OutgoingMessage::to(
                event.subscriber.address(),
                replies::subscription_confirmed(tier, until),
            ));
        }

        let channel = self.channel.clone();
        tokio::spawn(async move {
            for notice in notices {
                let target = notice.reply_target.clone().unwrap_or_default();
                if let Err(e) = channel.send(notice).await {
                    warn!("payment notice to {target} failed: {e}");
                }
            }
        });
    }
}
