//! # slipbot-core
//!
//! Core types, traits, configuration, and error handling for Slipbot.

pub mod config;
pub mod entitlement;
pub mod error;
pub mod expiry;
pub mod identity;
pub mod message;
pub mod traits;
