//! # slipbot-channels
//!
//! Messaging channel integrations for Slipbot.

pub mod twilio;

pub use twilio::{InboundForm, TwilioChannel};
