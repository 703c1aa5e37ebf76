//! Gateway: ties the chat channel and the payment gateway to the entitlement
//! state machine, with answer providers for free text.
//!
//! Two entry points share one [`EntitlementMachine`]: inbound chat messages
//! (`pipeline`) and payment confirmations (`callback`). Neither holds a
//! subscriber lock across a network call.

mod callback;
mod intent;
mod pipeline;
pub mod replies;
mod slips;


pub use callback::CallbackOutcome;
pub use slips::StaticSlips;

use replies::Prices;
use slipbot_core::{
    message::OutgoingMessage,
    traits::{AnswerProvider, NotificationChannel, PaymentGateway, SlipSource},
};
use slipbot_memory::EntitlementMachine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Timeouts for calls that leave the process.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Whole answer-provider chain.
    pub answer: Duration,
    /// One payment initiation, token fetch included.
    pub payment: Duration,
}

/// The central gateway.
pub struct Gateway {
    pub(super) machine: EntitlementMachine,
    pub(super) answers: Arc<dyn AnswerProvider>,
    pub(super) payments: Option<Arc<dyn PaymentGateway>>,
    pub(super) channel: Arc<dyn NotificationChannel>,
    pub(super) slips: Arc<dyn SlipSource>,
    /// Operator address for payment notices.
    pub(super) admin_target: Option<String>,
    pub(super) bot_name: String,
    pub(super) prices: Prices,
    pub(super) timeouts: Timeouts,
    pub(super) uptime: Instant,
}

impl Gateway {
    /// Create a new gateway.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        machine: EntitlementMachine,
        answers: Arc<dyn AnswerProvider>,
        payments: Option<Arc<dyn PaymentGateway>>,
        channel: Arc<dyn NotificationChannel>,
        slips: Arc<dyn SlipSource>,
        admin_target: Option<String>,
        bot_name: String,
        prices: Prices,
        timeouts: Timeouts,
    ) -> Self {
        info!(
            "Gateway ready | store: {} | answers: {} | payments: {} | channel: {}",
            machine.store().name(),
            answers.name(),
            payments.as_ref().map(|p| p.name()).unwrap_or("none"),
            channel.name(),
        );
        Self {
            machine,
            answers,
            payments,
            channel,
            slips,
            admin_target,
            bot_name,
            prices,
            timeouts,
            uptime: Instant::now(),
        }
    }

    pub fn machine(&self) -> &EntitlementMachine {
        &self.machine
    }

    pub fn uptime(&self) -> Duration {
        self.uptime.elapsed()
    }

    /// Send a reply, logging (not propagating) delivery failures.
    pub(super) async fn send(&self, message: OutgoingMessage) {
        let target = message.reply_target.clone().unwrap_or_default();
        if let Err(e) = self.channel.send(message).await {
            warn!("failed to send reply to {target}: {e}");
        }
    }
}
