//! Time parsing helpers shared by the classifiers and the command line.
//!
//! All timestamps found in log names and log lines are wall-clock times of the
//! machine that wrote them, so every parse resolves against the local zone.

use std::sync::OnceLock;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use regex::Regex;

use crate::models::TimeWindow;

/// Date-time layouts accepted by [`parse_time`], tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y%m%d%H%M%S",
    "%Y-%m-%d_%H-%M-%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts accepted by [`parse_time`], resolved to midnight.
const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"];

/// Unix timestamps above this value are taken as milliseconds.
const UNIX_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const SPAN_PATTERN: &str = r"^(\d+)([mhdw])$";

fn span_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(SPAN_PATTERN))
        .as_ref()
        .map_err(|e| anyhow!("Failed to compile span pattern: {}", e))
}

/// Resolve a naive wall-clock time in the local zone.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// do not exist locally (DST spring-forward gap) are an error.
pub fn to_local(naive: NaiveDateTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("{} does not exist in the local time zone", naive))
}

/// Parse `value` with a chrono format string and resolve it locally.
pub fn parse_local(value: &str, format: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value, format)
        .with_context(|| format!("Failed to parse time '{}' as '{}'", value, format))?;
    to_local(naive)
}

/// Local midnight starting `date`.
pub fn start_of_day(date: NaiveDate) -> Result<DateTime<Local>> {
    to_local(date.and_time(NaiveTime::MIN))
}

/// Parse `YYYY-MM-DD_HH-MM-SS_ffffff`, the stamp embedded in archived server logs.
///
/// The trailing field is a microsecond count. When it is missing or not a
/// number the stamp is parsed at second precision.
pub fn parse_micros_stamp(value: &str) -> Result<DateTime<Local>> {
    let (seconds, micros) = match value.rsplit_once('_') {
        Some((head, tail)) if head.matches('_').count() == 1 => (head, tail.parse::<i64>().ok()),
        _ => (value, None),
    };

    let base = parse_local(seconds, "%Y-%m-%d_%H-%M-%S")?;
    Ok(match micros {
        Some(micros) => base + Duration::microseconds(micros),
        None => base,
    })
}

/// Parse a user supplied point in time.
///
/// Accepts RFC 3339, the layouts in [`DATETIME_FORMATS`] and [`DATE_FORMATS`],
/// the archived-log stamp, a bare `HH:MM:SS` (today), and Unix timestamps in
/// seconds or milliseconds.
pub fn parse_time(value: &str) -> Result<DateTime<Local>> {
    let value = value.trim();
    if value.is_empty() {
        bail!("empty time string");
    }

    if value.matches('_').count() == 2 {
        if let Ok(time) = parse_micros_stamp(value) {
            return Ok(time);
        }
    }

    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Local));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return to_local(naive);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return start_of_day(date);
        }
    }

    if let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M:%S") {
        return to_local(Local::now().date_naive().and_time(time));
    }

    if let Ok(timestamp) = value.parse::<i64>() {
        let time = if timestamp > UNIX_MILLIS_THRESHOLD {
            Local.timestamp_millis_opt(timestamp).single()
        } else {
            Local.timestamp_opt(timestamp, 0).single()
        };
        return time.ok_or_else(|| anyhow!("timestamp {} is out of range", timestamp));
    }

    bail!("unrecognized time format: {}", value)
}

/// Parse a relative span such as `30m`, `1h`, `2d` or `1w`.
pub fn parse_relative_span(value: &str) -> Result<Duration> {
    let captures = span_pattern()?.captures(value.trim()).ok_or_else(|| {
        anyhow!(
            "invalid time span '{}', expected something like 30m, 1h, 2d or 1w",
            value
        )
    })?;

    let amount: i64 = captures[1]
        .parse()
        .with_context(|| format!("invalid time span amount '{}'", &captures[1]))?;

    let minutes_per_unit = match &captures[2] {
        "m" => 1,
        "h" => 60,
        "d" => 60 * 24,
        _ => 60 * 24 * 7,
    };

    amount
        .checked_mul(minutes_per_unit)
        .and_then(Duration::try_minutes)
        .ok_or_else(|| anyhow!("time span '{}' is too large", value))
}

/// Calendar shortcuts offered by the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarRange {
    Today,
    Yesterday,
    ThisWeek,
}

impl CalendarRange {
    /// Resolve the shortcut against `now`.
    ///
    /// Weeks start on Monday. Yesterday ends at 23:59:59.
    pub fn window(self, now: DateTime<Local>) -> Result<TimeWindow> {
        let today = now.date_naive();
        match self {
            CalendarRange::Today => TimeWindow::new(start_of_day(today)?, now),
            CalendarRange::Yesterday => {
                let yesterday = today
                    .pred_opt()
                    .ok_or_else(|| anyhow!("no day before {}", today))?;
                let end = yesterday
                    .and_hms_opt(23, 59, 59)
                    .ok_or_else(|| anyhow!("invalid end of day for {}", yesterday))?;
                TimeWindow::new(start_of_day(yesterday)?, to_local(end)?)
            }
            CalendarRange::ThisWeek => {
                let offset = today.weekday().num_days_from_monday() as i64;
                let monday = today - Duration::days(offset);
                TimeWindow::new(start_of_day(monday)?, now)
            }
        }
    }
}
