//! Entitlement store: the single source of truth for subscription state.
//!
//! Split into backends:
//! - `json_file`: one pretty-printed JSON document, rewritten on every put
//! - `sqlite`: one row per subscriber
//!
//! Both entry points (chat webhook and payment callback) mutate records only
//! through [`modify`], which serialises read-modify-write per subscriber.

mod json_file;
mod locks;
mod sqlite;


pub use json_file::JsonFileStore;
pub use locks::KeyedLocks;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use slipbot_core::{
    config::{shellexpand, StoreConfig},
    entitlement::EntitlementRecord,
    error::SlipbotError,
    identity::SubscriberId,
};
use std::sync::Arc;
use tracing::debug;

/// Persistent mapping from subscriber to entitlement record.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Backend name (e.g. "json", "sqlite").
    fn name(&self) -> &str;

    /// Fetch a record. An unseen subscriber yields the default record, which is
    /// not persisted.
    async fn get(&self, id: &SubscriberId) -> Result<EntitlementRecord, SlipbotError>;

    /// Upsert a record. Durable before returning.
    async fn put(&self, id: &SubscriberId, record: &EntitlementRecord) -> Result<(), SlipbotError>;

    /// Number of persisted records.
    async fn count(&self) -> Result<usize, SlipbotError>;

    /// Release backend resources.
    async fn close(&self) -> Result<(), SlipbotError> {
        Ok(())
    }

    /// Per-subscriber locks used by [`modify`].
    fn locks(&self) -> &KeyedLocks;
}

/// Read-modify-write one record under its subscriber lock.
///
/// Returns the record as stored afterwards. A mutation that leaves the record
/// unchanged skips the write, so replayed events cost nothing.
pub async fn modify<F>(
    store: &dyn EntitlementStore,
    id: &SubscriberId,
    mutate: F,
) -> Result<EntitlementRecord, SlipbotError>
where
    F: FnOnce(&mut EntitlementRecord) + Send,
{
    let _guard = store.locks().lock(id.as_str()).await;

    let mut record = store.get(id).await?;
    let before = record.clone();
    mutate(&mut record);

    if record == before {
        debug!("store[{}]: {id} unchanged, skipping write", store.name());
    } else {
        store.put(id, &record).await?;
    }
    Ok(record)
}

/// Open the backend selected by `config.backend`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn EntitlementStore>, SlipbotError> {
    match config.backend.as_str() {
        "json" => Ok(Arc::new(JsonFileStore::open(shellexpand(&config.path)).await?)),
        "sqlite" => Ok(Arc::new(SqliteStore::open(&shellexpand(&config.db_path)).await?)),
        other => Err(SlipbotError::Config(format!(
            "unknown store backend '{other}'"
        ))),
    }
}
