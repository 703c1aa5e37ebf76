//! # slipbot-memory
//!
//! Persistent entitlement store (JSON file or SQLite) and the subscription
//! state machine that is its only writer.

pub mod machine;
pub mod store;

pub use machine::{Confirmation, EntitlementMachine, Snapshot};
pub use store::{modify, open_store, EntitlementStore, JsonFileStore, KeyedLocks, SqliteStore};
