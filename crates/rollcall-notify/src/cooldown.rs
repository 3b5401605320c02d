//! Per-identity notification cooldown.
//!
//! Keyed by email. A claim both checks and records the timestamp under one
//! lock, so overlapping callers for the same email cannot both succeed
//! inside one window.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Default cooldown window between two notifications for the same email.
pub const DEFAULT_COOLDOWN_SECS: i64 = 24 * 60 * 60;

/// Default store size above which expired records are purged on claim.
pub const DEFAULT_PURGE_THRESHOLD: usize = 1024;

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// No record inside the window; `now` was recorded.
    Granted,
    /// A notification was recorded at `last`, within the window.
    Cooling { last: DateTime<Utc> },
}

/// Storage for last-notified timestamps.
pub trait CooldownStore: Send + Sync {
    /// Atomically grant and record `now` iff no record exists for `email`
    /// or `now - last >= window`.
    fn try_claim(&self, email: &str, now: DateTime<Utc>, window: Duration) -> Claim;

    fn last_notified(&self, email: &str) -> Option<DateTime<Utc>>;

    /// Drop records whose window has elapsed at `now`. Returns how many were dropped.
    fn purge_expired(&self, now: DateTime<Utc>, window: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory cooldown store.
///
/// An expired record carries no information (the next claim is granted
/// either way), so records older than the window are evicted whenever the
/// map grows past `purge_threshold`.
pub struct MemoryCooldownStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    purge_threshold: usize,
}

impl Default for MemoryCooldownStore {
    fn default() -> Self {
        Self::new(DEFAULT_PURGE_THRESHOLD)
    }
}

impl MemoryCooldownStore {
    pub fn new(purge_threshold: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            purge_threshold,
        }
    }
}

fn retain_live(
    entries: &mut HashMap<String, DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> usize {
    let before = entries.len();
    entries.retain(|_, last| now.signed_duration_since(*last) < window);
    before - entries.len()
}

impl CooldownStore for MemoryCooldownStore {
    fn try_claim(&self, email: &str, now: DateTime<Utc>, window: Duration) -> Claim {
        let mut entries = self.entries.lock();

        if entries.len() >= self.purge_threshold {
            let purged = retain_live(&mut entries, now, window);
            if purged > 0 {
                tracing::debug!(purged, remaining = entries.len(), "cooldown records purged");
            }
        }

        if let Some(&last) = entries.get(email) {
            // A late tick carrying an older `now` sees a negative elapsed time
            // and stays suppressed.
            if now.signed_duration_since(last) < window {
                return Claim::Cooling { last };
            }
        }

        entries.insert(email.to_string(), now);
        Claim::Granted
    }

    fn last_notified(&self, email: &str) -> Option<DateTime<Utc>> {
        self.entries.lock().get(email).copied()
    }

    fn purge_expired(&self, now: DateTime<Utc>, window: Duration) -> usize {
        retain_live(&mut self.entries.lock(), now, window)
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn day() -> Duration {
        Duration::seconds(DEFAULT_COOLDOWN_SECS)
    }

    #[test]
    fn test_first_claim_granted_and_recorded() {
        let store = MemoryCooldownStore::default();
        assert_eq!(store.try_claim("a@x.com", t0(), day()), Claim::Granted);
        assert_eq!(store.last_notified("a@x.com"), Some(t0()));
    }

    #[test]
    fn test_claim_within_window_suppressed() {
        let store = MemoryCooldownStore::default();
        store.try_claim("a@x.com", t0(), day());
        let later = t0() + Duration::hours(23);
        assert_eq!(store.try_claim("a@x.com", later, day()), Claim::Cooling { last: t0() });
        assert_eq!(store.last_notified("a@x.com"), Some(t0()));
    }

    #[test]
    fn test_claim_at_window_boundary_granted() {
        let store = MemoryCooldownStore::default();
        store.try_claim("a@x.com", t0(), day());
        let t2 = t0() + day();
        assert_eq!(store.try_claim("a@x.com", t2, day()), Claim::Granted);
        assert_eq!(store.last_notified("a@x.com"), Some(t2));
    }

    #[test]
    fn test_out_of_order_claim_suppressed() {
        let store = MemoryCooldownStore::default();
        store.try_claim("a@x.com", t0(), day());
        let earlier = t0() - Duration::milliseconds(100);
        assert!(matches!(store.try_claim("a@x.com", earlier, day()), Claim::Cooling { .. }));
    }

    #[test]
    fn test_emails_are_independent() {
        let store = MemoryCooldownStore::default();
        assert_eq!(store.try_claim("a@x.com", t0(), day()), Claim::Granted);
        assert_eq!(store.try_claim("b@x.com", t0(), day()), Claim::Granted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryCooldownStore::default();
        store.try_claim("old@x.com", t0(), day());
        store.try_claim("new@x.com", t0() + Duration::hours(20), day());

        let purged = store.purge_expired(t0() + Duration::hours(25), day());
        assert_eq!(purged, 1);
        assert_eq!(store.len(), 1);
        assert!(store.last_notified("old@x.com").is_none());
    }

    #[test]
    fn test_store_size_bounded_by_threshold() {
        let store = MemoryCooldownStore::new(4);
        // Each email is claimed a full window after the previous one, so
        // every older record has expired by the time the next one lands.
        for i in 0..100 {
            let now = t0() + day() * i;
            assert_eq!(store.try_claim(&format!("u{i}@x.com"), now, day()), Claim::Granted);
            assert!(store.len() <= 5, "store grew to {}", store.len());
        }
    }

    #[test]
    fn test_live_records_survive_purge() {
        let store = MemoryCooldownStore::new(2);
        store.try_claim("a@x.com", t0(), day());
        store.try_claim("b@x.com", t0(), day());
        // Threshold reached; both records are still live.
        store.try_claim("c@x.com", t0() + Duration::hours(1), day());
        assert_eq!(store.len(), 3);
        assert!(matches!(
            store.try_claim("a@x.com", t0() + Duration::hours(2), day()),
            Claim::Cooling { .. }
        ));
    }
}
