//! Key validation decision.
//!
//! Checks run in a fixed order and stop at the first failure:
//! - Key exists
//! - Key is enabled
//! - Key has not expired
//! - Usage ceiling not reached
//!
//! The order only matters for diagnostics. Every rejection maps to the same
//! wire status so unauthenticated callers learn nothing about the registry.

use crate::protocol::models::AuthStatus;
use crate::registry::record::KeyRecord;
use chrono::{DateTime, Utc};
use std::fmt;

/// Why a key was rejected. Never sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No record for this key.
    UnknownKey,
    /// Record exists but is administratively disabled.
    Disabled,
    /// Current time is at or after the record's expiry.
    Expired,
    /// `usage_count` has reached `max_usage`.
    QuotaExhausted,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::UnknownKey => "unknown key",
            Self::Disabled => "key disabled",
            Self::Expired => "key expired",
            Self::QuotaExhausted => "usage quota exhausted",
        };
        f.write_str(reason)
    }
}

/// Outcome of validating one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Key may be used; the caller must count one use.
    Accept,
    /// Key may not be used.
    Reject(RejectReason),
}

impl Decision {
    /// Whether this is an acceptance.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Collapse to the wire status.
    pub fn status(&self) -> AuthStatus {
        match self {
            Self::Accept => AuthStatus::Accept,
            Self::Reject(_) => AuthStatus::Reject,
        }
    }
}

/// Decide whether `record` may be used at `now`.
///
/// Pure: counting the use on `Accept` is the registry's job, done under the
/// same exclusive lock that produced `record`.
pub fn evaluate(record: Option<&KeyRecord>, now: DateTime<Utc>) -> Decision {
    // 1. Existence
    let Some(record) = record else {
        return Decision::Reject(RejectReason::UnknownKey);
    };

    // 2. Enablement
    if !record.valid {
        return Decision::Reject(RejectReason::Disabled);
    }

    // 3. Expiry
    if record.is_expired(now) {
        return Decision::Reject(RejectReason::Expired);
    }

    // 4. Quota
    if record.is_exhausted() {
        return Decision::Reject(RejectReason::QuotaExhausted);
    }

    Decision::Accept
}
