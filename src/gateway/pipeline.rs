//! Inbound message flow: resolve the sender, route the intent, send the reply.

use super::intent::Intent;
use super::replies;
use super::Gateway;
use chrono::{DateTime, Utc};
use slipbot_core::{
    entitlement::{PaidTier, Tier},
    identity::SubscriberId,
    message::{IncomingMessage, MessageMetadata, OutgoingMessage},
};
use std::time::Instant;
use tracing::{error, info, warn};

/// A reply and which provider, if any, produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub text: String,
    pub provider_used: Option<String>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider_used: None,
        }
    }
}

impl Gateway {
    /// Process a single incoming message and send the reply.
    pub async fn handle_message(&self, incoming: IncomingMessage) {
        self.handle_message_at(incoming, Utc::now()).await;
    }

    pub(crate) async fn handle_message_at(&self, incoming: IncomingMessage, now: DateTime<Utc>) {
        let start = Instant::now();
        let preview = if incoming.text.chars().count() > 60 {
            let truncated: String = incoming.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            incoming.text.clone()
        };
        let queued_ms = (Utc::now() - incoming.received_at).num_milliseconds().max(0);
        info!(
            "[{}] {} ({}) says: {} | msg {} sid {} queued {queued_ms}ms",
            incoming.channel,
            incoming.sender_name.as_deref().unwrap_or("unknown"),
            incoming.sender_id,
            preview,
            incoming.id,
            incoming.platform_id.as_deref().unwrap_or("-"),
        );

        // --- 1. RESOLVE IDENTITY ---
        let id = match SubscriberId::parse(&incoming.sender_id) {
            Ok(id) => id,
            Err(e) => {
                warn!("dropping message with unusable sender: {e}");
                return;
            }
        };

        // --- 2. ROUTE ---
        let reply = self.reply_for(&id, &incoming.text, now).await;

        // --- 3. SEND ---
        self.send(OutgoingMessage {
            text: reply.text,
            metadata: MessageMetadata {
                provider_used: reply.provider_used,
                processing_time_ms: start.elapsed().as_millis() as u64,
            },
            reply_target: Some(id.address().to_string()),
        })
        .await;
    }

    /// Decide the reply to `text` from `id`. Mutates only through the state
    /// machine.
    pub(crate) async fn reply_for(&self, id: &SubscriberId, text: &str, now: DateTime<Utc>) -> Reply {
        let snapshot = match self.machine.snapshot(id, now).await {
            Ok(s) => s,
            Err(e) => {
                error!("entitlement lookup failed for {id}: {e}");
                return Reply::text(replies::SERVICE_UNAVAILABLE);
            }
        };

        let intent = Intent::classify(text);

        // Nothing but acceptance gets past the rules gate.
        if !snapshot.rules_accepted() {
            if intent != Intent::AcceptRules {
                return Reply::text(replies::rules_reminder(&self.bot_name));
            }
            return match self.machine.on_accept_rules(id).await {
                Ok(_) => Reply::text(replies::welcome(&self.bot_name, &self.prices)),
                Err(e) => {
                    error!("failed to record rules acceptance for {id}: {e}");
                    Reply::text(replies::SERVICE_UNAVAILABLE)
                }
            };
        }

        match intent {
            Intent::AcceptRules | Intent::Menu => Reply::text(replies::menu(&self.prices)),
            Intent::QueryFreeTips => self.slip_reply(Tier::Free).await,
            Intent::QueryPaidTips => {
                if snapshot.tier >= Tier::Normal {
                    self.slip_reply(Tier::Normal).await
                } else {
                    Reply::text(replies::upsell(PaidTier::Normal, &self.prices))
                }
            }
            Intent::QueryPremiumTips => {
                if snapshot.tier == Tier::Premium {
                    self.slip_reply(Tier::Premium).await
                } else {
                    Reply::text(replies::upsell(PaidTier::Premium, &self.prices))
                }
            }
            Intent::Subscribe(tier) => self.subscribe_reply(id, tier).await,
            Intent::Fallback => self.answer_reply(text).await,
        }
    }

    async fn slip_reply(&self, tier: Tier) -> Reply {
        match self.slips.slip(tier).await {
            Ok(slip) => Reply::text(slip),
            Err(e) => {
                error!("slip source failed for {tier}: {e}");
                Reply::text(replies::SLIPS_UNAVAILABLE)
            }
        }
    }

    async fn subscribe_reply(&self, id: &SubscriberId, tier: PaidTier) -> Reply {
        let Some(gateway) = &self.payments else {
            warn!("subscribe {tier} from {id}: no payment gateway configured");
            return Reply::text(replies::PAYMENT_FAILED);
        };

        let started = tokio::time::timeout(
            self.timeouts.payment,
            gateway.initiate(id.msisdn(), tier),
        )
        .await;

        match started {
            Ok(Ok(true)) => {
                info!("payment initiated: {tier} for {id} via {}", gateway.name());
                Reply::text(replies::payment_initiated(tier))
            }
            Ok(Ok(false)) => {
                warn!("{} rejected {tier} payment for {id}", gateway.name());
                Reply::text(replies::PAYMENT_FAILED)
            }
            Ok(Err(e)) => {
                warn!("payment initiation failed for {id}: {e}");
                Reply::text(replies::PAYMENT_FAILED)
            }
            Err(_) => {
                warn!(
                    "payment initiation for {id} timed out after {}s",
                    self.timeouts.payment.as_secs()
                );
                Reply::text(replies::PAYMENT_FAILED)
            }
        }
    }

    async fn answer_reply(&self, text: &str) -> Reply {
        match tokio::time::timeout(self.timeouts.answer, self.answers.respond(text.trim())).await {
            Ok(Ok(answer)) => Reply {
                text: answer,
                provider_used: Some(self.answers.name().to_string()),
            },
            Ok(Err(e)) => {
                error!("answer providers failed: {e}");
                Reply::text(replies::ANSWERS_UNAVAILABLE)
            }
            Err(_) => {
                error!(
                    "answer providers timed out after {}s",
                    self.timeouts.answer.as_secs()
                );
                Reply::text(replies::ANSWERS_UNAVAILABLE)
            }
        }
    }
}
