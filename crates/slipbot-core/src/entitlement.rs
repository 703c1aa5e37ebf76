//! Entitlement data model and its pure transitions.
//!
//! A record stores only grant dates and the rules flag. The effective [`Tier`]
//! is derived from the grants at read time and is never persisted.

use crate::expiry::is_expired;
use crate::identity::SubscriberId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Effective entitlement level, ordered `Free < Normal < Premium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Normal,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Normal => "normal",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tier that can be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaidTier {
    Normal,
    Premium,
}

impl PaidTier {
    /// The account reference sent to and echoed back by the payment provider.
    pub fn account_reference(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Premium => "premium",
        }
    }

    /// Parse an upstream account reference. Case-sensitive by contract.
    pub fn from_account_reference(reference: &str) -> Option<Self> {
        match reference {
            "normal" => Some(Self::Normal),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Self::Normal => Tier::Normal,
            Self::Premium => Tier::Premium,
        }
    }
}

impl fmt::Display for PaidTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.account_reference())
    }
}

/// A purchase of a tier, starting its window on `granted_on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    #[serde(alias = "purchaseDate")]
    pub granted_on: NaiveDate,
}

/// Per-subscriber state. `Default` is the unseen-identity record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    #[serde(default, alias = "normal")]
    pub normal_grant: Option<Grant>,
    #[serde(default, alias = "premium")]
    pub premium_grant: Option<Grant>,
    #[serde(default)]
    pub rules_accepted: bool,
}

impl EntitlementRecord {
    /// Derive the effective tier at `now`: Premium first, then Normal, else Free.
    pub fn effective_tier(&self, now: DateTime<Utc>, window_days: i64) -> Tier {
        if !is_expired(self.premium_grant.map(|g| g.granted_on), now, window_days) {
            Tier::Premium
        } else if !is_expired(self.normal_grant.map(|g| g.granted_on), now, window_days) {
            Tier::Normal
        } else {
            Tier::Free
        }
    }

    /// Record a confirmed purchase. A Premium purchase refreshes Normal too.
    ///
    /// Grants only move forward: an earlier date than the stored one is ignored,
    /// so a late-delivered callback cannot shorten a newer window.
    pub fn apply_payment(&mut self, tier: PaidTier, confirmed_on: NaiveDate) {
        if tier == PaidTier::Premium {
            advance(&mut self.premium_grant, confirmed_on);
        }
        advance(&mut self.normal_grant, confirmed_on);
    }

    /// One-way: once accepted, never reverts.
    pub fn accept_rules(&mut self) {
        self.rules_accepted = true;
    }
}

fn advance(slot: &mut Option<Grant>, date: NaiveDate) {
    match slot {
        Some(existing) if existing.granted_on > date => {}
        _ => *slot = Some(Grant { granted_on: date }),
    }
}

/// A confirmed payment, produced by the callback parser. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub subscriber: SubscriberId,
    pub tier: PaidTier,
    pub amount: u64,
    pub confirmed_on: NaiveDate,
    /// Provider receipt number, when the callback carries one.
    pub receipt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::DEFAULT_WINDOW_DAYS;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(d: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap())
    }

    #[test]
    fn test_default_record_is_free_and_unaccepted() {
        let record = EntitlementRecord::default();
        assert!(!record.rules_accepted);
        assert_eq!(record.effective_tier(Utc::now(), DEFAULT_WINDOW_DAYS), Tier::Free);
    }

    #[test]
    fn test_premium_payment_sets_both_grants() {
        let d = date(2026, 5, 4);
        let mut record = EntitlementRecord::default();
        record.apply_payment(PaidTier::Premium, d);
        assert_eq!(record.premium_grant, Some(Grant { granted_on: d }));
        assert_eq!(record.normal_grant, Some(Grant { granted_on: d }));
        assert_eq!(record.effective_tier(noon(d), DEFAULT_WINDOW_DAYS), Tier::Premium);
    }

    #[test]
    fn test_normal_payment_keeps_premium_grant() {
        let mut record = EntitlementRecord::default();
        record.apply_payment(PaidTier::Premium, date(2026, 5, 4));
        record.apply_payment(PaidTier::Normal, date(2026, 5, 6));
        assert_eq!(record.premium_grant.unwrap().granted_on, date(2026, 5, 4));
        assert_eq!(record.normal_grant.unwrap().granted_on, date(2026, 5, 6));
        assert_eq!(
            record.effective_tier(noon(date(2026, 5, 6)), DEFAULT_WINDOW_DAYS),
            Tier::Premium
        );
    }

    #[test]
    fn test_premium_lapse_falls_back_to_normal() {
        let mut record = EntitlementRecord::default();
        record.apply_payment(PaidTier::Premium, date(2026, 5, 1));
        record.apply_payment(PaidTier::Normal, date(2026, 5, 6));
        assert_eq!(
            record.effective_tier(noon(date(2026, 5, 9)), DEFAULT_WINDOW_DAYS),
            Tier::Normal
        );
        assert_eq!(
            record.effective_tier(noon(date(2026, 5, 13)), DEFAULT_WINDOW_DAYS),
            Tier::Free
        );
    }

    #[test]
    fn test_payment_replay_is_idempotent() {
        let d = date(2026, 5, 4);
        let mut once = EntitlementRecord::default();
        once.apply_payment(PaidTier::Premium, d);
        let mut twice = once.clone();
        twice.apply_payment(PaidTier::Premium, d);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_earlier_confirmation_never_moves_grant_back() {
        let mut record = EntitlementRecord::default();
        record.apply_payment(PaidTier::Normal, date(2026, 5, 10));
        record.apply_payment(PaidTier::Normal, date(2026, 5, 2));
        assert_eq!(record.normal_grant.unwrap().granted_on, date(2026, 5, 10));
    }

    #[test]
    fn test_expired_grants_are_retained() {
        let mut record = EntitlementRecord::default();
        record.apply_payment(PaidTier::Normal, date(2026, 1, 1));
        assert_eq!(
            record.effective_tier(noon(date(2026, 2, 1)), DEFAULT_WINDOW_DAYS),
            Tier::Free
        );
        assert!(record.normal_grant.is_some());
    }

    #[test]
    fn test_accept_rules_is_one_way() {
        let mut record = EntitlementRecord::default();
        record.accept_rules();
        record.accept_rules();
        assert!(record.rules_accepted);
    }

    #[test]
    fn test_account_reference_is_case_sensitive() {
        assert_eq!(PaidTier::from_account_reference("premium"), Some(PaidTier::Premium));
        assert_eq!(PaidTier::from_account_reference("normal"), Some(PaidTier::Normal));
        assert_eq!(PaidTier::from_account_reference("Premium"), None);
        assert_eq!(PaidTier::from_account_reference("gold"), None);
    }

    #[test]
    fn test_record_json_layout() {
        let mut record = EntitlementRecord::default();
        record.apply_payment(PaidTier::Normal, date(2026, 5, 4));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["normalGrant"]["grantedOn"], "2026-05-04");
        assert!(json["premiumGrant"].is_null());
        assert_eq!(json["rulesAccepted"], false);
        assert!(json.get("tier").is_none(), "derived tier must not be persisted");
    }

    #[test]
    fn test_legacy_layout_loads() {
        let legacy = r#"{"subscription":"premium","premium":{"purchaseDate":"2026-04-01"},"normal":{"purchaseDate":"2026-04-01"}}"#;
        let record: EntitlementRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(record.premium_grant.unwrap().granted_on, date(2026, 4, 1));
        assert_eq!(record.normal_grant.unwrap().granted_on, date(2026, 4, 1));
        assert!(!record.rules_accepted);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Free < Tier::Normal);
        assert!(Tier::Normal < Tier::Premium);
    }
}
