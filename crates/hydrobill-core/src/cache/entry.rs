use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A value held in memory by a [`TtlCache`](super::TtlCache).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
    /// Write order within one cache, breaks `stored_at` ties during eviction.
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        is_live(self.stored_at, self.ttl, now)
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Liveness rule shared by memory and mirror entries: `now - stored_at <= ttl`.
pub(crate) fn is_live(stored_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match TimeDelta::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(stored_at) <= ttl,
        // A ttl too large for chrono never expires
        Err(_) => true,
    }
}

/// On-disk shape of a mirrored entry: `{ "data", "timestamp", "ttl" }`.
///
/// `timestamp` is the original write time in epoch milliseconds and `ttl` is
/// in milliseconds; both are restored verbatim on promotion. The cache stores
/// `stored_at` at millisecond precision so a promoted entry expires at the
/// same instant as the one that was written. Sub-millisecond parts of `ttl`
/// are dropped, so a promoted entry can only expire early, never late.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MirrorRecord<T> {
    pub data: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "ttl_millis")]
    pub ttl: Duration,
}

mod ttl_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(stored_at: DateTime<Utc>, ttl_secs: u64) -> CacheEntry<u32> {
        CacheEntry {
            value: 1,
            stored_at,
            ttl: Duration::from_secs(ttl_secs),
            seq: 0,
        }
    }

    #[test]
    fn test_entry_live_until_ttl_inclusive() {
        let now = Utc::now();
        let entry = entry_at(now, 60);

        assert!(entry.is_live_at(now));
        assert!(entry.is_live_at(now + TimeDelta::seconds(60)));
        assert!(!entry.is_live_at(now + TimeDelta::milliseconds(60_001)));
    }

    #[test]
    fn test_entry_live_under_clock_skew() {
        let now = Utc::now();
        let entry = entry_at(now, 1);
        assert!(entry.is_live_at(now - TimeDelta::minutes(5)));
    }

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        assert_eq!(entry_at(now, 0).age_display(now), "just now");
        assert_eq!(entry_at(now - TimeDelta::minutes(5), 0).age_display(now), "5m ago");
        assert_eq!(entry_at(now - TimeDelta::minutes(95), 0).age_display(now), "2h ago");
        assert_eq!(entry_at(now - TimeDelta::hours(26), 0).age_display(now), "1d ago");
    }

    #[test]
    fn test_mirror_record_wire_format() {
        let stored_at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let record = MirrorRecord {
            data: "hello",
            timestamp: stored_at,
            ttl: Duration::from_secs(300),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "data": "hello", "timestamp": 1_700_000_000_123_i64, "ttl": 300_000 })
        );

        let back: MirrorRecord<String> = serde_json::from_value(json).unwrap();
        assert_eq!(back.timestamp, stored_at);
        assert_eq!(back.ttl, Duration::from_secs(300));
    }
}
