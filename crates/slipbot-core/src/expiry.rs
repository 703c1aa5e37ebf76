//! Grant expiry. Pure functions; `now` is always passed in.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Length of a subscription window in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Midnight UTC of the grant date: the instant a grant starts counting.
fn grant_start(granted_on: NaiveDate) -> DateTime<Utc> {
    granted_on.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Whether a grant has lapsed at `now`.
///
/// A missing grant is always expired. Exactly `window_days` elapsed counts as
/// expired. A grant dated after `now` (clock skew) is not expired.
pub fn is_expired(granted_on: Option<NaiveDate>, now: DateTime<Utc>, window_days: i64) -> bool {
    let Some(date) = granted_on else {
        return true;
    };
    let elapsed = now - grant_start(date);
    if elapsed < Duration::zero() {
        return false;
    }
    elapsed >= Duration::days(window_days)
}

/// The instant a grant stops entitling its holder.
pub fn expires_at(granted_on: NaiveDate, window_days: i64) -> DateTime<Utc> {
    grant_start(granted_on) + Duration::days(window_days)
}
