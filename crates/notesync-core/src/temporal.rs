//! Time parsing for publish/update timestamps.
//!
//! Pages show times as relative phrases ("3小时前", "昨天"), bare dates
//! ("03-15", "3月15日"), or machine timestamps in attributes and meta tags.
//! Relative and bare forms are interpreted in the page's local calendar,
//! represented by a fixed UTC offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::defaults::UTC_OFFSET_HOURS;

/// Unit of a relative-time phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelativeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
    Now,
    Today,
    Yesterday,
}

impl RelativeUnit {
    fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
            Self::Months => 2_592_000,
            Self::Years => 31_536_000,
            Self::Now | Self::Today | Self::Yesterday => 0,
        }
    }
}

static RELATIVE_PATTERNS: Lazy<Vec<(Regex, RelativeUnit)>> = Lazy::new(|| {
    [
        (r"(\d+)\s*秒前", RelativeUnit::Seconds),
        (r"(\d+)\s*分钟前", RelativeUnit::Minutes),
        (r"(\d+)\s*小时前", RelativeUnit::Hours),
        (r"(\d+)\s*天前", RelativeUnit::Days),
        (r"(\d+)\s*周前", RelativeUnit::Weeks),
        (r"(\d+)\s*月前", RelativeUnit::Months),
        (r"(\d+)\s*年前", RelativeUnit::Years),
        (r"刚刚", RelativeUnit::Now),
        (r"今天", RelativeUnit::Today),
        (r"昨天", RelativeUnit::Yesterday),
    ]
    .into_iter()
    .map(|(pattern, unit)| (Regex::new(pattern).expect("static pattern"), unit))
    .collect()
});

static FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("static pattern"));
static MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})-(\d{1,2})").expect("static pattern"));
static MONTH_DAY_CJK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})月(\d{1,2})日").expect("static pattern"));

/// Trailing location suffixes such as `" · Beijing"` are dropped before matching.
static TRAILING_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[^\d\p{Han}]+$").expect("static pattern"));

/// The page's local UTC offset.
pub fn local_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(UTC_OFFSET_HOURS * 3600).expect("valid offset"))
}

/// Current time in the default page calendar.
pub fn local_now() -> DateTime<FixedOffset> {
    chrono::Utc::now().with_timezone(&local_offset(UTC_OFFSET_HOURS))
}

/// Convert a displayed time phrase into Unix seconds relative to `now`.
///
/// Order: relative phrases, then absolute dates (`YYYY-MM-DD`, `MM-DD`,
/// `MM月DD日`, the last two in `now`'s year), then `now` itself with a
/// warning. Empty input is `now`.
pub fn parse_relative_time(text: &str, now: DateTime<FixedOffset>) -> i64 {
    let current = now.timestamp();
    if text.trim().is_empty() {
        return current;
    }

    let clean = TRAILING_NOISE.replace(text, "");
    let clean = clean.trim();

    for (regex, unit) in RELATIVE_PATTERNS.iter() {
        let Some(caps) = regex.captures(clean) else {
            continue;
        };
        let amount: i64 = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return match unit {
            RelativeUnit::Now => current,
            RelativeUnit::Today => start_of_day(now, 0).unwrap_or(current),
            RelativeUnit::Yesterday => start_of_day(now, 1).unwrap_or(current),
            unit => current - amount * unit.seconds(),
        };
    }

    if let Some(ts) = parse_absolute_date(clean, now) {
        return ts;
    }

    warn!(subsystem = "core", component = "temporal", text = %text, "Unparsable time text, using now");
    current
}

fn start_of_day(now: DateTime<FixedOffset>, days_back: i64) -> Option<i64> {
    let date = (now - Duration::days(days_back)).date_naive();
    local_midnight(now.offset(), date)
}

fn local_midnight(offset: &FixedOffset, date: NaiveDate) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
}

fn parse_absolute_date(text: &str, now: DateTime<FixedOffset>) -> Option<i64> {
    let num = |caps: &regex::Captures, i: usize| -> Option<u32> { caps.get(i)?.as_str().parse().ok() };

    if let Some(caps) = FULL_DATE.captures(text) {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, num(&caps, 2)?, num(&caps, 3)?)?;
        return local_midnight(now.offset(), date);
    }
    for regex in [&*MONTH_DAY, &*MONTH_DAY_CJK] {
        if let Some(caps) = regex.captures(text) {
            let date = NaiveDate::from_ymd_opt(now.year(), num(&caps, 1)?, num(&caps, 2)?)?;
            return local_midnight(now.offset(), date);
        }
    }
    None
}

/// Convert a machine timestamp into epoch milliseconds.
///
/// Accepts epoch seconds or milliseconds (numbers below 10^11 are taken as
/// seconds), RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY/MM/DD HH:MM:SS` and
/// `YYYY-MM-DD`; zone-less forms are read in `offset`.
pub fn to_epoch_millis(text: &str, offset: &FixedOffset) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<f64>() {
        return Some(normalize_epoch(n));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| local_midnight(offset, date))
        .map(|secs| secs * 1000)
}

/// Convert an embedded-state JSON value into epoch milliseconds.
pub fn json_epoch_millis(value: &Value, offset: &FixedOffset) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| *f > 0.0).map(normalize_epoch),
        Value::String(s) => to_epoch_millis(s, offset),
        _ => None,
    }
}

fn normalize_epoch(n: f64) -> i64 {
    if n.abs() < 1e11 {
        (n * 1000.0) as i64
    } else {
        n as i64
    }
}
