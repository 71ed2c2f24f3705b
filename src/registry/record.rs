//! Metadata kept for each issued license key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-key state owned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Administrative enablement flag.
    pub valid: bool,

    /// Issuance time.
    pub created_at: DateTime<Utc>,

    /// At or after this instant the key is rejected.
    pub expires_at: DateTime<Utc>,

    /// Successful validations so far.
    pub usage_count: u64,

    /// Ceiling on `usage_count`.
    pub max_usage: u64,
}

impl KeyRecord {
    /// A fresh, enabled record issued at `now`.
    ///
    /// `None` when `now + validity` is not a representable instant.
    pub fn issued(now: DateTime<Utc>, validity: chrono::Duration, max_usage: u64) -> Option<Self> {
        Some(Self {
            valid: true,
            created_at: now,
            expires_at: now.checked_add_signed(validity)?,
            usage_count: 0,
            max_usage,
        })
    }

    /// Whether the key is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the usage ceiling has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.usage_count >= self.max_usage
    }

    /// Enabled and unexpired; usage is not considered.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.valid && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issued_record() {
        let record = KeyRecord::issued(now(), chrono::Duration::days(30), 10).unwrap();
        assert!(record.valid);
        assert_eq!(record.usage_count, 0);
        assert_eq!(record.max_usage, 10);
        assert_eq!(record.expires_at, now() + chrono::Duration::days(30));
    }

    #[test]
    fn test_issued_beyond_calendar_range() {
        let validity = chrono::Duration::try_days(100_000_000).unwrap();
        assert_eq!(KeyRecord::issued(now(), validity, 10), None);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let record = KeyRecord::issued(now(), chrono::Duration::hours(1), 10).unwrap();
        assert!(!record.is_expired(now() + chrono::Duration::minutes(59)));
        assert!(record.is_expired(now() + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_exhaustion() {
        let mut record = KeyRecord::issued(now(), chrono::Duration::days(1), 2).unwrap();
        record.usage_count = 1;
        assert!(!record.is_exhausted());
        record.usage_count = 2;
        assert!(record.is_exhausted());
        assert!(record.is_live(now()));
    }
}
