//! # slipbot-providers
//!
//! Answer providers for free-text messages, and the fallback chain that tries
//! them in order.

pub mod fallback;
pub mod openai;

pub use fallback::FallbackChain;
pub use openai::OpenAiCompatProvider;
