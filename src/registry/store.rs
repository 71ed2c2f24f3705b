//! Lock-guarded key map.
//!
//! All access goes through one reader/writer lock. Reads share it;
//! inserts, enablement changes and validations take it exclusively.
//! Validation holds the write lock across the whole check-then-increment
//! sequence, so two concurrent callers can never both pass the quota check
//! for the last remaining use.

use crate::policy::validation::{evaluate, Decision};
use crate::registry::record::KeyRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe map from license key to its record.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: RwLock<HashMap<String, KeyRecord>>,
}

impl KeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never leave the map half-updated, so a poisoned
    // lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, KeyRecord>> {
        self.keys.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, KeyRecord>> {
        self.keys.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a record, silently replacing any existing one for `key`.
    pub fn insert(&self, key: impl Into<String>, record: KeyRecord) {
        self.write().insert(key.into(), record);
    }

    /// Point-in-time copy of a record.
    pub fn get(&self, key: &str) -> Option<KeyRecord> {
        self.read().get(key).cloned()
    }

    /// Copy of every record, taken under a single shared lock.
    pub fn snapshot(&self) -> Vec<(String, KeyRecord)> {
        self.read()
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// Enable or disable a key. Returns `false` if the key is unknown.
    pub fn set_valid(&self, key: &str, valid: bool) -> bool {
        match self.write().get_mut(key) {
            Some(record) => {
                record.valid = valid;
                true
            }
            None => false,
        }
    }

    /// Validate `key` at `now`, counting one use on acceptance.
    ///
    /// Rejections leave the registry untouched.
    pub fn validate(&self, key: &str, now: DateTime<Utc>) -> Decision {
        let mut keys = self.write();
        let record = keys.get_mut(key);

        let decision = evaluate(record.as_deref(), now);

        if let (Decision::Accept, Some(record)) = (decision, record) {
            record.usage_count += 1;
        }

        decision
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no key has been issued.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::validation::RejectReason;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn fresh(max_usage: u64) -> KeyRecord {
        KeyRecord::issued(now(), chrono::Duration::days(30), max_usage).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let registry = KeyRegistry::new();
        assert!(registry.is_empty());

        registry.insert("k1", fresh(5));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("k1"), Some(fresh(5)));
        assert_eq!(registry.get("k2"), None);
    }

    #[test]
    fn test_insert_overwrites() {
        let registry = KeyRegistry::new();
        registry.insert("k1", fresh(5));
        registry.insert("k1", fresh(9));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("k1").unwrap().max_usage, 9);
    }

    #[test]
    fn test_validate_increments_once() {
        let registry = KeyRegistry::new();
        registry.insert("k1", fresh(5));

        assert_eq!(registry.validate("k1", now()), Decision::Accept);
        assert_eq!(registry.get("k1").unwrap().usage_count, 1);
    }

    #[test]
    fn test_rejection_does_not_mutate() {
        let registry = KeyRegistry::new();
        let mut record = fresh(5);
        record.valid = false;
        record.usage_count = 2;
        registry.insert("k1", record.clone());

        assert_eq!(
            registry.validate("k1", now()),
            Decision::Reject(RejectReason::Disabled)
        );
        assert_eq!(registry.get("k1"), Some(record));
    }

    #[test]
    fn test_unknown_key_not_inserted() {
        let registry = KeyRegistry::new();
        assert_eq!(
            registry.validate("missing", now()),
            Decision::Reject(RejectReason::UnknownKey)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_valid() {
        let registry = KeyRegistry::new();
        registry.insert("k1", fresh(5));

        assert!(registry.set_valid("k1", false));
        assert!(!registry.get("k1").unwrap().valid);
        assert!(!registry.set_valid("missing", false));
    }

    #[test]
    fn test_snapshot_copies_all() {
        let registry = KeyRegistry::new();
        registry.insert("a", fresh(1));
        registry.insert("b", fresh(2));

        let mut snapshot = registry.snapshot();
        snapshot.sort_by(|x, y| x.0.cmp(&y.0));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, "a");
        assert_eq!(snapshot[1].1.max_usage, 2);
    }
}
