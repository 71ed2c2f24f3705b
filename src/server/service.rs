//! Authorization service: the registry plus issuance and reporting rules.
//!
//! Constructed once at startup and shared by handle with every request
//! handler. Holds no locks of its own; all serialization happens inside
//! [`KeyRegistry`].

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::crypto::digest::key_fingerprint;
use crate::crypto::keygen::generate_key;
use crate::policy::validation::Decision;
use crate::protocol::models::AuthStatus;
use crate::registry::record::KeyRecord;
use crate::registry::store::KeyRegistry;
use crate::XzipError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// A key returned by [`AuthService::issue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    /// The new license key.
    pub key: String,
    /// Its stored record.
    pub record: KeyRecord,
}

/// Aggregate registry figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    /// All records.
    pub total_keys: usize,
    /// Records that are enabled and unexpired.
    pub valid_keys: usize,
    /// Sum of usage counts.
    pub total_usage: u64,
    /// When the figures were taken.
    pub taken_at: DateTime<Utc>,
}

/// Demo keys inserted by [`AuthService::seed_demo_keys`].
pub mod demo {
    /// Enabled, unexpired, plenty of uses.
    pub const ACTIVE: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
    /// Administratively disabled.
    pub const DISABLED: &str = "d15ab1edd15ab1edd15ab1edd15ab1ed";
    /// Expired yesterday.
    pub const EXPIRED: &str = "e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0";
    /// Usage ceiling already reached.
    pub const EXHAUSTED: &str = "0000ffff0000ffff0000ffff0000ffff";
}

/// Shared authorization state.
pub struct AuthService {
    registry: KeyRegistry,
    clock: Arc<dyn Clock>,
    service_name: String,
    default_max_usage: u64,
    default_validity: chrono::Duration,
}

impl AuthService {
    /// Create a service with an empty registry and the system clock.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a service with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config, clock)
    }

    fn with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: KeyRegistry::new(),
            clock,
            service_name: config.service_name.clone(),
            default_max_usage: config.default_max_usage,
            default_validity: config.default_validity,
        }
    }

    /// Validate a key and collapse the outcome to its wire status.
    ///
    /// The rejection reason is logged but never returned.
    pub fn authorize(&self, key: &str) -> AuthStatus {
        let now = self.clock.now_utc();
        let decision = self.registry.validate(key, now);

        match decision {
            Decision::Accept => {
                info!(key = %key_fingerprint(key), "License key accepted");
            }
            Decision::Reject(reason) => {
                info!(key = %key_fingerprint(key), %reason, "License key rejected");
            }
        }

        decision.status()
    }

    /// Issue a fresh key.
    ///
    /// `max_usage` and `validity` fall back to the configured defaults.
    ///
    /// # Errors
    /// Returns `Config` when the expiry would fall outside the calendar range.
    pub fn issue(
        &self,
        max_usage: Option<u64>,
        validity: Option<chrono::Duration>,
    ) -> Result<IssuedKey, XzipError> {
        let now = self.clock.now_utc();
        let validity = validity.unwrap_or(self.default_validity);
        let record = KeyRecord::issued(
            now,
            validity,
            max_usage.unwrap_or(self.default_max_usage),
        )
        .ok_or_else(|| {
            XzipError::Config(format!(
                "Key validity of {} days is out of range",
                validity.num_days()
            ))
        })?;
        let key = generate_key();

        self.registry.insert(key.clone(), record.clone());

        info!(
            key = %key_fingerprint(&key),
            max_usage = record.max_usage,
            expires_at = %record.expires_at.to_rfc3339(),
            "Issued license key"
        );

        Ok(IssuedKey { key, record })
    }

    /// Aggregate figures over one consistent snapshot.
    pub fn stats(&self) -> KeyStats {
        let now = self.clock.now_utc();
        let snapshot = self.registry.snapshot();

        let valid_keys = snapshot
            .iter()
            .filter(|(_, record)| record.is_live(now))
            .count();
        let total_usage = snapshot.iter().map(|(_, record)| record.usage_count).sum();

        KeyStats {
            total_keys: snapshot.len(),
            valid_keys,
            total_usage,
            taken_at: now,
        }
    }

    /// Insert the fixed demo key set, one per validation outcome.
    pub fn seed_demo_keys(&self) -> Result<(), XzipError> {
        let now = self.clock.now_utc();
        let year = chrono::Duration::days(365);
        let record = |issued_at, validity, max_usage| {
            KeyRecord::issued(issued_at, validity, max_usage)
                .ok_or_else(|| XzipError::Config("Clock is outside the calendar range".to_string()))
        };

        self.registry.insert(demo::ACTIVE, record(now, year, 1000)?);

        self.registry.insert(demo::DISABLED, record(now, year, 1000)?);
        self.registry.set_valid(demo::DISABLED, false);

        self.registry.insert(
            demo::EXPIRED,
            record(
                now - chrono::Duration::days(31),
                chrono::Duration::days(30),
                1000,
            )?,
        );

        let mut exhausted = record(now, year, 10)?;
        exhausted.usage_count = exhausted.max_usage;
        self.registry.insert(demo::EXHAUSTED, exhausted);

        debug!(count = self.registry.len(), "Seeded demo keys");
        Ok(())
    }

    /// The underlying registry.
    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Current time according to the service clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Name reported by health and the status page.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
