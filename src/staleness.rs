//! Staleness policy
//!
//! Pure decision function: is the last successful sync older than the
//! allowed maximum age? Only used to decide whether to *run* a
//! reconciliation; it never blocks or delays a read.

use chrono::{DateTime, Duration, Utc};

/// Default maximum age for scheduled checks. The scheduler may pass a
/// shorter value for more aggressive refresh policies.
pub const DEFAULT_MAX_AGE_HOURS: u32 = 24;

/// A series that has never synced (`None`) is always stale.
pub fn is_stale(
    last_success: Option<DateTime<Utc>>,
    max_age_hours: u32,
    now: DateTime<Utc>,
) -> bool {
    match last_success {
        None => true,
        Some(t) => now.signed_duration_since(t) > Duration::hours(max_age_hours as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_synced_is_stale() {
        assert!(is_stale(None, DEFAULT_MAX_AGE_HOURS, Utc::now()));
    }

    #[test]
    fn test_recent_sync_is_fresh() {
        let now = Utc::now();
        let last = now - Duration::hours(2);
        assert!(!is_stale(Some(last), 24, now));
    }

    #[test]
    fn test_old_sync_is_stale() {
        let now = Utc::now();
        let last = now - Duration::hours(30);
        assert!(is_stale(Some(last), 24, now));
    }

    #[test]
    fn test_exactly_max_age_is_fresh() {
        let now = Utc::now();
        let last = now - Duration::hours(24);
        assert!(!is_stale(Some(last), 24, now));
    }

    #[test]
    fn test_monotonic_in_max_age() {
        let now = Utc::now();
        let last = now - Duration::hours(10);

        // Stale at some max age implies stale at every shorter max age.
        for max_age in 1..=48u32 {
            if is_stale(Some(last), max_age, now) {
                for shorter in 1..max_age {
                    assert!(
                        is_stale(Some(last), shorter, now),
                        "stale at {}h but fresh at {}h",
                        max_age,
                        shorter
                    );
                }
            }
        }
    }
}
