//! Worker activity classification from location-ping recency.
//!
//! Pure function of (now - last_update); recomputed at every render and
//! never cached, so a worker whose pings stop drifts through the buckets
//! without any state transition logic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Elapsed minutes below which a worker counts as active.
pub const ACTIVE_WITHIN_MINUTES: i64 = 5;
/// Elapsed minutes below which a worker counts as recent.
pub const RECENT_WITHIN_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Active,
    Recent,
    Offline,
}

impl Activity {
    /// Marker fill for the bucket (green / yellow / gray).
    pub fn color(self) -> &'static str {
        match self {
            Activity::Active => "#22C55E",
            Activity::Recent => "#EAB308",
            Activity::Offline => "#6B7280",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Active => "active",
            Activity::Recent => "recent",
            Activity::Offline => "offline",
        }
    }
}

/// Bucket a worker by elapsed time since the last location update.
///
/// Bounds are half-open: exactly 5:00 elapsed is `Recent`, exactly 15:00
/// is `Offline`. A last_update in the future (clock skew between the
/// worker's phone and this host) counts as `Active`.
pub fn classify(last_update: DateTime<Utc>, now: DateTime<Utc>) -> Activity {
    let elapsed = now - last_update;
    if elapsed < Duration::minutes(ACTIVE_WITHIN_MINUTES) {
        Activity::Active
    } else if elapsed < Duration::minutes(RECENT_WITHIN_MINUTES) {
        Activity::Recent
    } else {
        Activity::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64, seconds: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        let last = now - Duration::minutes(minutes) - Duration::seconds(seconds);
        (last, now)
    }

    #[test]
    fn test_boundaries_resolve_to_stricter_bucket() {
        let (last, now) = at(4, 59);
        assert_eq!(classify(last, now), Activity::Active);
        let (last, now) = at(5, 0);
        assert_eq!(classify(last, now), Activity::Recent);
        let (last, now) = at(14, 59);
        assert_eq!(classify(last, now), Activity::Recent);
        let (last, now) = at(15, 0);
        assert_eq!(classify(last, now), Activity::Offline);
    }

    #[test]
    fn test_ten_and_twenty_minute_workers() {
        let (last, now) = at(10, 0);
        assert_eq!(classify(last, now), Activity::Recent);
        let (last, now) = at(20, 0);
        assert_eq!(classify(last, now), Activity::Offline);
    }

    #[test]
    fn test_future_update_counts_as_active() {
        let now = Utc::now();
        let last = now + Duration::minutes(2);
        assert_eq!(classify(last, now), Activity::Active);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let (last, now) = at(7, 30);
        assert_eq!(classify(last, now), classify(last, now));
    }
}
