use thiserror::Error;

/// Top-level error type for Slipbot.
#[derive(Debug, Error)]
pub enum SlipbotError {
    /// The entitlement store could not be read or written.
    ///
    /// Non-retryable for the current request: callers must not continue on
    /// in-memory state that would diverge from the persisted store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A payment callback was missing required fields or was not a success.
    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// Error from an answer (language-model) provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the payment gateway.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A subscriber identity with no usable phone digits.
    #[error("invalid subscriber identity: {0}")]
    InvalidIdentity(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
