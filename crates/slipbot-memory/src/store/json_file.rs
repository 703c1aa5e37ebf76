//! Single-file JSON backend.
//!
//! The whole map is rewritten on every put: serialised next to the target as
//! `<file>.tmp`, then renamed over it, so readers of the file only ever see a
//! complete document. The in-memory copy is updated only after the rename
//! succeeds and never runs ahead of disk.

use super::{EntitlementStore, KeyedLocks};
use async_trait::async_trait;
use slipbot_core::{
    entitlement::EntitlementRecord, error::SlipbotError, identity::SubscriberId,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

type Records = BTreeMap<String, EntitlementRecord>;

/// Entitlement store backed by one human-readable JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<Records>,
    locks: KeyedLocks,
}

impl JsonFileStore {
    /// Load `path`, or start empty if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SlipbotError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SlipbotError::StoreUnavailable(format!("failed to create data dir: {e}"))
            })?;
        }

        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Records::new(),
            Ok(content) => parse_records(&content, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Records::new(),
            Err(e) => {
                return Err(SlipbotError::StoreUnavailable(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        info!(
            "Entitlement store loaded from {} ({} records)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
            locks: KeyedLocks::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_all(&self, records: &Records) -> Result<(), SlipbotError> {
        let body = serde_json::to_string_pretty(records)
            .map_err(|e| SlipbotError::StoreUnavailable(format!("serialize failed: {e}")))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await.map_err(|e| {
            SlipbotError::StoreUnavailable(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            SlipbotError::StoreUnavailable(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// Parse the store document, re-keying every entry to its canonical identity.
///
/// Files written by older deployments may key the same subscriber as both
/// `whatsapp:2547…` (payment side) and `whatsapp:+2547…` (chat side); such
/// entries are merged keeping the newest grants. Keys that are not phone
/// identities are dropped with a warning.
fn parse_records(content: &str, path: &Path) -> Result<Records, SlipbotError> {
    let raw: BTreeMap<String, EntitlementRecord> = serde_json::from_str(content).map_err(|e| {
        SlipbotError::StoreUnavailable(format!("failed to parse {}: {e}", path.display()))
    })?;

    let mut records = Records::new();
    for (key, record) in raw {
        match SubscriberId::parse(&key) {
            Ok(id) => match records.get_mut(id.as_str()) {
                Some(existing) => merge_into(existing, record),
                None => {
                    records.insert(id.as_str().to_string(), record);
                }
            },
            Err(_) => warn!("store: skipping unrecognised key {key:?}"),
        }
    }
    Ok(records)
}

fn merge_into(existing: &mut EntitlementRecord, other: EntitlementRecord) {
    existing.normal_grant = existing.normal_grant.max(other.normal_grant);
    existing.premium_grant = existing.premium_grant.max(other.premium_grant);
    existing.rules_accepted |= other.rules_accepted;
}

#[async_trait]
impl EntitlementStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn get(&self, id: &SubscriberId) -> Result<EntitlementRecord, SlipbotError> {
        let records = self.records.lock().await;
        Ok(records.get(id.as_str()).cloned().unwrap_or_default())
    }

    async fn put(&self, id: &SubscriberId, record: &EntitlementRecord) -> Result<(), SlipbotError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.insert(id.as_str().to_string(), record.clone());
        self.write_all(&next).await?;
        *records = next;
        Ok(())
    }

    async fn count(&self) -> Result<usize, SlipbotError> {
        Ok(self.records.lock().await.len())
    }

    fn locks(&self) -> &KeyedLocks {
        &self.locks
    }
}
