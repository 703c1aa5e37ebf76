//! Subscription state machine.
//!
//! The only component that mutates entitlement records. Both the chat flow and
//! the payment callback flow go through it, and every mutation runs under the
//! subscriber's lock via [`modify`].

use crate::store::{modify, EntitlementStore};
use chrono::{DateTime, Utc};
use slipbot_core::{
    entitlement::{EntitlementRecord, PaymentEvent, Tier},
    error::SlipbotError,
    identity::SubscriberId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// A record together with the tier derived from it at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub record: EntitlementRecord,
    pub tier: Tier,
}

impl Snapshot {
    pub fn rules_accepted(&self) -> bool {
        self.record.rules_accepted
    }
}

/// Result of applying a payment confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// The record as stored afterwards.
    pub record: EntitlementRecord,
    /// False when the event was already reflected in the record (a replay).
    pub changed: bool,
}

/// Applies transitions to the entitlement store.
#[derive(Clone)]
pub struct EntitlementMachine {
    store: Arc<dyn EntitlementStore>,
    window_days: i64,
}

impl EntitlementMachine {
    pub fn new(store: Arc<dyn EntitlementStore>, window_days: i64) -> Self {
        Self { store, window_days }
    }

    pub fn store(&self) -> &Arc<dyn EntitlementStore> {
        &self.store
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Read a subscriber's record and derive its tier at `now`.
    pub async fn snapshot(
        &self,
        id: &SubscriberId,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, SlipbotError> {
        let record = self.store.get(id).await?;
        let tier = self.derive_effective_tier(&record, now);
        Ok(Snapshot { record, tier })
    }

    /// Record a confirmed payment. Replays are no-ops and report `changed: false`.
    pub async fn on_payment_confirmed(
        &self,
        event: &PaymentEvent,
    ) -> Result<Confirmation, SlipbotError> {
        let mut before = None;
        let record = modify(self.store.as_ref(), &event.subscriber, |r| {
            before = Some(r.clone());
            r.apply_payment(event.tier, event.confirmed_on)
        })
        .await?;
        let changed = before.as_ref() != Some(&record);
        if changed {
            info!(
                "entitlement: {} granted {} on {} (amount {})",
                event.subscriber, event.tier, event.confirmed_on, event.amount
            );
        } else {
            debug!(
                "entitlement: {} already holds {} from {}",
                event.subscriber, event.tier, event.confirmed_on
            );
        }
        Ok(Confirmation { record, changed })
    }

    /// Mark the rules as accepted. Returns whether this call changed anything.
    pub async fn on_accept_rules(&self, id: &SubscriberId) -> Result<bool, SlipbotError> {
        let mut was_accepted = false;
        modify(self.store.as_ref(), id, |r| {
            was_accepted = r.rules_accepted;
            r.accept_rules();
        })
        .await?;
        if was_accepted {
            debug!("entitlement: {id} already accepted rules");
        } else {
            info!("entitlement: {id} accepted rules");
        }
        Ok(!was_accepted)
    }

    pub fn derive_effective_tier(&self, record: &EntitlementRecord, now: DateTime<Utc>) -> Tier {
        record.effective_tier(now, self.window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;
    use chrono::{NaiveDate, TimeZone};
    use slipbot_core::entitlement::PaidTier;
    use slipbot_core::expiry::DEFAULT_WINDOW_DAYS;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d.and_hms_opt(h, 0, 0).unwrap())
    }

    fn event(raw: &str, tier: PaidTier, on: NaiveDate) -> PaymentEvent {
        PaymentEvent {
            subscriber: SubscriberId::parse(raw).unwrap(),
            tier,
            amount: match tier {
                PaidTier::Normal => 150,
                PaidTier::Premium => 300,
            },
            confirmed_on: on,
            receipt: None,
        }
    }

    async fn machine(dir: &tempfile::TempDir) -> EntitlementMachine {
        let store = JsonFileStore::open(dir.path().join("users.json")).await.unwrap();
        EntitlementMachine::new(Arc::new(store), DEFAULT_WINDOW_DAYS)
    }

    #[tokio::test]
    async fn test_unseen_subscriber_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let id = SubscriberId::parse("whatsapp:+254711111111").unwrap();

        let snap = m.snapshot(&id, Utc::now()).await.unwrap();
        assert_eq!(snap.tier, Tier::Free);
        assert!(!snap.rules_accepted());
        assert_eq!(m.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_callback_grants_premium_to_chat_identity() {
        // The callback carries a bare MSISDN; the chat side uses whatsapp:+...
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let d = date(2026, 10, 16);

        m.on_payment_confirmed(&event("254700000000", PaidTier::Premium, d))
            .await
            .unwrap();

        let chat_id = SubscriberId::parse("whatsapp:+254700000000").unwrap();
        let snap = m.snapshot(&chat_id, at(d, 9)).await.unwrap();
        assert_eq!(snap.tier, Tier::Premium);
        assert_eq!(snap.record.normal_grant.unwrap().granted_on, d);
        assert_eq!(snap.record.premium_grant.unwrap().granted_on, d);

        // Seven days later both windows have lapsed.
        let later = m.snapshot(&chat_id, at(date(2026, 10, 23), 0)).await.unwrap();
        assert_eq!(later.tier, Tier::Free);
    }

    #[tokio::test]
    async fn test_replayed_confirmation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let e = event("254700000000", PaidTier::Normal, date(2026, 10, 1));

        let first = m.on_payment_confirmed(&e).await.unwrap();
        let second = m.on_payment_confirmed(&e).await.unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.record, second.record);
        assert_eq!(m.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_accept_rules_reports_change_once() {
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let id = SubscriberId::parse("254700000000").unwrap();

        assert!(m.on_accept_rules(&id).await.unwrap());
        assert!(!m.on_accept_rules(&id).await.unwrap());
        assert!(m.snapshot(&id, Utc::now()).await.unwrap().rules_accepted());
    }

    #[tokio::test]
    async fn test_payment_preserves_rules_flag() {
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let id = SubscriberId::parse("254700000000").unwrap();

        m.on_accept_rules(&id).await.unwrap();
        let confirmed = m
            .on_payment_confirmed(&event("254700000000", PaidTier::Normal, date(2026, 10, 1)))
            .await
            .unwrap();
        assert!(confirmed.changed);
        assert!(confirmed.record.rules_accepted);
    }

    #[tokio::test]
    async fn test_concurrent_accept_and_payment_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let id = SubscriberId::parse("254700000000").unwrap();
        let d = date(2026, 10, 16);

        let premium = event("254700000000", PaidTier::Premium, d);
        let normal = event("254700000000", PaidTier::Normal, d);
        let (a, b, c) = tokio::join!(
            m.on_accept_rules(&id),
            m.on_payment_confirmed(&premium),
            m.on_payment_confirmed(&normal),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let snap = m.snapshot(&id, at(d, 12)).await.unwrap();
        assert!(snap.rules_accepted());
        assert_eq!(snap.tier, Tier::Premium);
        assert_eq!(snap.record.normal_grant.unwrap().granted_on, d);
    }

    #[tokio::test]
    async fn test_upgrade_same_day_counts_as_change() {
        let dir = tempfile::tempdir().unwrap();
        let m = machine(&dir).await;
        let d = date(2026, 10, 16);

        m.on_payment_confirmed(&event("254700000000", PaidTier::Normal, d))
            .await
            .unwrap();
        let upgrade = m
            .on_payment_confirmed(&event("254700000000", PaidTier::Premium, d))
            .await
            .unwrap();
        assert!(upgrade.changed);

        // Normal after Premium on the same day adds nothing.
        let normal_again = m
            .on_payment_confirmed(&event("254700000000", PaidTier::Normal, d))
            .await
            .unwrap();
        assert!(!normal_again.changed);
    }

    #[tokio::test]
    async fn test_custom_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json")).await.unwrap();
        let m = EntitlementMachine::new(Arc::new(store), 30);
        let d = date(2026, 9, 1);

        m.on_payment_confirmed(&event("254700000000", PaidTier::Normal, d))
            .await
            .unwrap();
        let id = SubscriberId::parse("254700000000").unwrap();
        assert_eq!(
            m.snapshot(&id, at(date(2026, 9, 20), 0)).await.unwrap().tier,
            Tier::Normal
        );
        assert_eq!(
            m.snapshot(&id, at(date(2026, 10, 1), 0)).await.unwrap().tier,
            Tier::Free
        );
    }
}
