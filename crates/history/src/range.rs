//! Query bounds
//!
//! Bounds are epoch milliseconds, inclusive on both ends. Textual bounds may
//! be epoch milliseconds, RFC 3339, or a naive ISO-8601 date-time read as UTC.
//! A relative window (`last=15m`) ends now.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use crate::error::{HistoryError, Result};

/// Inclusive timestamp interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    pub start: i64,
    pub end: i64,
}

impl RangeQuery {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Everything
    pub fn unbounded() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }

    /// `[now - window, now]`
    pub fn last(window: TimeDelta, now: DateTime<Utc>) -> Self {
        let end = now.timestamp_millis();
        Self::new(end.saturating_sub(window.num_milliseconds()), end)
    }

    /// Build from request-style parameters
    ///
    /// `last` excludes `start`/`end`; a missing explicit bound is open.
    pub fn from_params(
        start: Option<&str>,
        end: Option<&str>,
        last: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some(window) = last {
            if start.is_some() || end.is_some() {
                return Err(HistoryError::ConflictingBounds);
            }
            return Ok(Self::last(parse_window(window)?, now));
        }

        let start = start.map(parse_bound).transpose()?.unwrap_or(i64::MIN);
        let end = end.map(parse_bound).transpose()?.unwrap_or(i64::MAX);
        Ok(Self::new(start, end))
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// `start > end` matches nothing
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Parse one bound into epoch milliseconds
pub fn parse_bound(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(HistoryError::invalid_bound(input, "empty"));
    }

    if let Ok(millis) = trimmed.parse::<i64>() {
        return Ok(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_millis());
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis())
        .map_err(|_| {
            HistoryError::invalid_bound(input, "expected epoch milliseconds or RFC 3339")
        })
}

/// Parse `<N><unit>` with unit `s`, `m`, `h` or `d`
pub fn parse_window(input: &str) -> Result<TimeDelta> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| HistoryError::invalid_window(input, "missing unit (s, m, h, d)"))?;
    let (amount, unit) = trimmed.split_at(split);

    let amount: i64 = amount
        .parse()
        .map_err(|_| HistoryError::invalid_window(input, "missing amount"))?;
    if amount <= 0 {
        return Err(HistoryError::invalid_window(input, "amount must be positive"));
    }

    let delta = match unit {
        "s" => TimeDelta::try_seconds(amount),
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        other => {
            return Err(HistoryError::invalid_window(
                input,
                format!("unknown unit '{other}'"),
            ))
        }
    };
    delta.ok_or_else(|| HistoryError::invalid_window(input, "out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_parse_bound_formats() {
        assert_eq!(parse_bound("1700000000000").unwrap(), 1_700_000_000_000);
        assert_eq!(parse_bound("1970-01-01T00:00:01Z").unwrap(), 1_000);
        assert_eq!(parse_bound("1970-01-01T01:00:01+01:00").unwrap(), 1_000);
        assert_eq!(parse_bound("1970-01-01T00:00:01.500").unwrap(), 1_500);
        assert!(parse_bound("yesterday").is_err());
        assert!(parse_bound("  ").is_err());
    }

    #[test]
    fn test_parse_window_units() {
        assert_eq!(parse_window("30s").unwrap(), TimeDelta::seconds(30));
        assert_eq!(parse_window("15m").unwrap(), TimeDelta::minutes(15));
        assert_eq!(parse_window("2h").unwrap(), TimeDelta::hours(2));
        assert_eq!(parse_window("7d").unwrap(), TimeDelta::days(7));
        assert!(parse_window("15").is_err());
        assert!(parse_window("m").is_err());
        assert!(parse_window("0s").is_err());
        assert!(parse_window("3w").is_err());
    }

    #[test]
    fn test_last_window_ends_now() {
        let range = RangeQuery::last(TimeDelta::minutes(1), now());
        assert_eq!(range.end, 1_700_000_000_000);
        assert_eq!(range.start, 1_700_000_000_000 - 60_000);
    }

    #[test]
    fn test_from_params() {
        let range = RangeQuery::from_params(Some("10"), Some("20"), None, now()).unwrap();
        assert_eq!(range, RangeQuery::new(10, 20));

        let open = RangeQuery::from_params(None, Some("20"), None, now()).unwrap();
        assert_eq!(open, RangeQuery::new(i64::MIN, 20));

        let last = RangeQuery::from_params(None, None, Some("1s"), now()).unwrap();
        assert_eq!(last.end - last.start, 1_000);

        assert!(matches!(
            RangeQuery::from_params(Some("1"), None, Some("1s"), now()),
            Err(HistoryError::ConflictingBounds)
        ));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = RangeQuery::new(1000, 2000);
        assert!(range.contains(1000));
        assert!(range.contains(2000));
        assert!(!range.contains(999));
        assert!(!range.contains(2001));
        assert!(RangeQuery::new(5, 1).is_empty());
    }
}
