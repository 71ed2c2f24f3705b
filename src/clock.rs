//! Clock abstraction so expiry decisions can be pinned in tests.

use chrono::{DateTime, Utc};

/// Source of the current time for key issuance and validation.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// System clock using actual wall time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing.
///
/// Shareable behind an `Arc<dyn Clock>`; advancing it is visible to every
/// holder, which lets a test move a running service past a key's expiry.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug)]
pub struct MockClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Create a mock clock frozen at the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Create a mock clock from an RFC 3339 string.
    pub fn from_rfc3339(s: &str) -> Self {
        Self::new(
            DateTime::parse_from_rfc3339(s)
                .expect("valid RFC 3339")
                .with_timezone(&Utc),
        )
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use std::sync::Arc;

    #[test]
    fn system_clock_returns_time() {
        let clock = SystemClock;
        assert!(clock.now_utc().year() >= 2024);
    }

    #[test]
    fn mock_clock_is_deterministic() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        assert_eq!(clock.now_utc().to_rfc3339(), "2025-01-15T12:00:00+00:00");
        assert_eq!(clock.now_utc().to_rfc3339(), "2025-01-15T12:00:00+00:00");
    }

    #[test]
    fn mock_clock_advance_is_shared() {
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let shared: Arc<dyn Clock> = clock.clone();

        clock.advance(chrono::Duration::days(2));

        assert_eq!(shared.now_utc().to_rfc3339(), "2025-01-17T12:00:00+00:00");
    }
}
