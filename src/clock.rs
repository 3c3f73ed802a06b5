//! Injectable time and jitter sources, plus the timestamp text format used in the store

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

use crate::error::{DialerError, Result};

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of retry jitter: a uniform value in `[0, 1)`
pub trait Jitter: Send + Sync {
    fn unit(&self) -> f64;
}

/// Thread-local RNG jitter
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadJitter;

impl Jitter for ThreadJitter {
    fn unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Constant jitter, clamped into `[0, 1)`
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn unit(&self) -> f64 {
        if self.0.is_nan() || self.0 < 0.0 {
            0.0
        } else if self.0 >= 1.0 {
            1.0 - f64::EPSILON
        } else {
            self.0
        }
    }
}

/// Render a timestamp the way the store keeps it: `2025-03-01T14:00:00Z`.
///
/// Fixed width and a `Z` suffix keep lexical order equal to time order, which
/// the `next_call_at <= ?` comparisons rely on.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse any RFC 3339 timestamp into UTC
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DialerError::invalid(format!("bad timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_second_precision_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap();
        assert_eq!(format_ts(ts), "2025-03-01T14:00:00Z");
    }

    #[test]
    fn test_parse_offset_timestamp() {
        let ts = parse_ts("2025-03-01T09:00:00-05:00").unwrap();
        assert_eq!(format_ts(ts), "2025-03-01T14:00:00Z");
        assert!(parse_ts("tomorrow").is_err());
    }

    #[test]
    fn test_fixed_jitter_stays_in_unit_interval() {
        assert_eq!(FixedJitter(-1.0).unit(), 0.0);
        assert!(FixedJitter(1.0).unit() < 1.0);
        assert_eq!(FixedJitter(0.25).unit(), 0.25);
        let j = ThreadJitter.unit();
        assert!((0.0..1.0).contains(&j));
    }
}
