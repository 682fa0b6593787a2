//! UTC instants used for invitation deadlines, audit records and token lifetimes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Largest offset `chrono::Duration::seconds` accepts.
const MAX_SHIFT_SECS: u64 = (i64::MAX / 1_000) as u64;

/// UTC instant, serialized as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self > other
    }

    /// Shift by whole days; a negative count moves backwards.
    pub fn add_days(&self, days: i64) -> Self {
        self.shifted(Duration::days(days))
    }

    pub fn minus_days(&self, days: i64) -> Self {
        self.shifted(Duration::days(-days))
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        self.shifted(Duration::seconds(secs.min(MAX_SHIFT_SECS) as i64))
    }

    /// JWT `iat`/`exp` values. Anything chrono cannot represent maps to the epoch.
    pub fn from_unix_secs(secs: u64) -> Self {
        let dt = i64::try_from(secs)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default();
        Self(dt)
    }

    /// Seconds since the epoch; instants before 1970 read as zero.
    pub fn as_unix_secs(&self) -> u64 {
        u64::try_from(self.0.timestamp()).unwrap_or(0)
    }

    fn shifted(&self, by: Duration) -> Self {
        Self(self.0.checked_add_signed(by).unwrap_or(self.0))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-15T00:00:00Z
    const ISSUED: u64 = 1_705_276_800;

    #[test]
    fn invitation_deadline_is_a_week_out() {
        let issued = Timestamp::from_unix_secs(ISSUED);
        let deadline = issued.add_days(7);

        assert_eq!(deadline.as_unix_secs(), ISSUED + 7 * 86_400);
        assert!(deadline.is_after(&issued));
        assert!(issued.is_before(&deadline));
    }

    #[test]
    fn minus_days_mirrors_add_days() {
        let now = Timestamp::from_unix_secs(ISSUED);
        assert_eq!(now.minus_days(3), now.add_days(-3));
        assert!(now.minus_days(1).is_before(&now));
    }

    #[test]
    fn token_expiry_adds_seconds() {
        let iat = Timestamp::from_unix_secs(ISSUED);
        assert_eq!(iat.plus_secs(3600).as_unix_secs(), ISSUED + 3600);
    }

    #[test]
    fn unrepresentable_unix_seconds_fall_back_to_epoch() {
        assert_eq!(Timestamp::from_unix_secs(u64::MAX).as_unix_secs(), 0);
    }

    #[test]
    fn now_lies_between_surrounding_clock_reads() {
        let before = Utc::now();
        let ts = Timestamp::now();
        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &Utc::now());
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let json = serde_json::to_string(&Timestamp::from_unix_secs(ISSUED)).unwrap();
        assert_eq!(json, "\"2024-01-15T00:00:00Z\"");
    }
}
