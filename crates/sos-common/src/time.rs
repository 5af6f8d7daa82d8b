//! Time handling for reanalysis archives.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported time unit: {0}")]
    UnsupportedUnit(String),
}

/// Step of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeStep {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeStep {
    fn seconds(&self) -> f64 {
        match self {
            TimeStep::Seconds => 1.0,
            TimeStep::Minutes => 60.0,
            TimeStep::Hours => 3600.0,
            TimeStep::Days => 86400.0,
        }
    }
}

/// Decoded CF `units` attribute of a time variable, e.g.
/// `hours since 1800-01-01 00:00:0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let (unit, reference) = s
            .split_once(" since ")
            .ok_or_else(|| TimeParseError::InvalidFormat(s.to_string()))?;

        let step = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => TimeStep::Seconds,
            "minutes" | "minute" | "mins" | "min" => TimeStep::Minutes,
            "hours" | "hour" | "hrs" | "hr" | "h" => TimeStep::Hours,
            "days" | "day" | "d" => TimeStep::Days,
            other => return Err(TimeParseError::UnsupportedUnit(other.to_string())),
        };

        let epoch = parse_reference(reference.trim())
            .ok_or_else(|| TimeParseError::InvalidFormat(s.to_string()))?;

        Ok(Self { step, epoch })
    }

    /// Convert an axis offset to an absolute time, rounded to the millisecond.
    pub fn to_datetime(&self, offset: f64) -> DateTime<Utc> {
        let millis = (offset * self.step.seconds() * 1000.0).round() as i64;
        self.epoch + Duration::milliseconds(millis)
    }
}

/// Parse a lenient CF reference time: `1800-1-1`, `1800-01-01 00:00:0.0`,
/// `1970-01-01T00:00:00Z`, with an optional trailing `UTC`.
fn parse_reference(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim_end_matches("UTC").trim().trim_end_matches('Z');
    let mut parts = s.splitn(2, |c: char| c == ' ' || c == 'T');
    let date_part = parts.next()?;
    let time_part = parts.next().map(str::trim).unwrap_or("");

    let mut ymd = date_part.split('-');
    let year: i32 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next()?.parse().ok()?;
    let day: u32 = ymd.next()?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (mut hour, mut minute, mut second) = (0u32, 0u32, 0.0f64);
    if !time_part.is_empty() {
        let mut hms = time_part.split(':');
        hour = hms.next()?.parse().ok()?;
        minute = hms.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
        second = hms.next().map(str::parse::<f64>).transpose().ok()?.unwrap_or(0.0);
    }

    let whole = second.trunc() as u32;
    let nanos = ((second - second.trunc()) * 1e9).round() as u32;
    let naive: NaiveDateTime = date.and_hms_nano_opt(hour, minute, whole, nanos)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Parse an ISO 8601 timestamp, assuming UTC when no offset is given.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }
    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// The timestamps to render: `start`, then every `step_hours` after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSchedule {
    pub start: DateTime<Utc>,
    pub step_hours: u32,
    /// Number of frames; `None` runs to the last available time.
    pub count: Option<usize>,
}

impl FrameSchedule {
    pub fn new(start: DateTime<Utc>, step_hours: u32, count: Option<usize>) -> Self {
        Self {
            start,
            step_hours,
            count,
        }
    }

    /// Expand the schedule against the times present in a dataset.
    pub fn timestamps(&self, available: &[DateTime<Utc>]) -> Vec<DateTime<Utc>> {
        let step = Duration::hours(self.step_hours.max(1) as i64);
        match self.count {
            Some(count) => (0..count)
                .map(|k| self.start + step * k as i32)
                .collect(),
            None => {
                let Some(last) = available.iter().max().copied() else {
                    return Vec::new();
                };
                let mut times = Vec::new();
                let mut t = self.start;
                while t <= last {
                    times.push(t);
                    t += step;
                }
                times
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reanalysis_units() {
        let units = TimeUnits::parse("hours since 1800-01-01 00:00:0.0").unwrap();
        assert_eq!(units.step, TimeStep::Hours);
        assert_eq!(units.epoch, Utc.with_ymd_and_hms(1800, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_lenient_reference() {
        let units = TimeUnits::parse("hours since 1800-1-1 00:00:00").unwrap();
        assert_eq!(units.epoch, Utc.with_ymd_and_hms(1800, 1, 1, 0, 0, 0).unwrap());

        let units = TimeUnits::parse("days since 1970-01-01").unwrap();
        assert_eq!(units.step, TimeStep::Days);

        let units = TimeUnits::parse("seconds since 2000-01-01T12:00:00Z").unwrap();
        assert_eq!(units.epoch, Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            TimeUnits::parse("fortnights since 1800-01-01"),
            Err(TimeParseError::UnsupportedUnit(_))
        ));
        assert!(matches!(
            TimeUnits::parse("hours"),
            Err(TimeParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_to_datetime_hours() {
        let units = TimeUnits::parse("hours since 1800-01-01 00:00:0.0").unwrap();
        // 2011-01-01 00Z in the NCEP reanalysis time axis
        let t = units.to_datetime(1849584.0);
        assert_eq!(t, Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap());
        let t = units.to_datetime(1849590.0);
        assert_eq!(t, Utc.with_ymd_and_hms(2011, 1, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_schedule_with_count() {
        let start = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        let schedule = FrameSchedule::new(start, 6, Some(3));
        let times = schedule.timestamps(&[]);
        assert_eq!(times.len(), 3);
        assert_eq!(times[2], Utc.with_ymd_and_hms(2011, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_schedule_until_end_of_data() {
        let start = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        let available: Vec<_> = (0..8).map(|h| start + Duration::hours(h * 3)).collect();
        let schedule = FrameSchedule::new(start, 6, None);
        let times = schedule.timestamps(&available);
        // 0, 6, 12, 18 fit before the last 21Z time
        assert_eq!(times.len(), 4);
    }

    #[test]
    fn test_parse_iso8601_forms() {
        let expected = Utc.with_ymd_and_hms(2011, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_iso8601("2011-03-01").unwrap(), expected);
        assert_eq!(parse_iso8601("2011-03-01T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_iso8601("2011-03-01T00:00:00").unwrap(), expected);
        assert!(parse_iso8601("March first").is_err());
    }
}
