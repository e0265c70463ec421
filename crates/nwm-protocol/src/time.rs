//! Time parsing and default windows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::errors::{ApiError, ApiResult};

/// Output format for every timestamp handed back to callers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Start of the analysis-assimilation archive.
pub const DEFAULT_EPOCH: &str = "2018-09-17T00:00:00";

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%d %H:%M %z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M",
    "%Y%m%d%H%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Parse a caller-supplied reference time.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.f]]` with an optional zone
/// suffix, date-only, compact (`2023112506`, `20231125T0600`), US-style
/// `MM/DD/YYYY` and month-name forms. Inputs without a zone are UTC.
///
/// # Example
///
/// ```rust
/// use nwm_protocol::time::parse_reference_time;
///
/// let t = parse_reference_time("2023-11-25 06:00:00 UTC").unwrap();
/// assert_eq!(t.to_rfc3339(), "2023-11-25T06:00:00+00:00");
/// ```
pub fn parse_reference_time(raw: &str) -> ApiResult<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(invalid_reference_time(raw));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    let naive = strip_utc_suffix(s);

    // YYYYMMDDHH carries no minutes, which chrono refuses to default.
    if naive.len() == 10 && naive.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}00", naive), "%Y%m%d%H%M") {
            return Ok(ndt.and_utc());
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(ndt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt) {
            if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
                return Ok(ndt.and_utc());
            }
        }
    }

    Err(invalid_reference_time(raw))
}

fn invalid_reference_time(raw: &str) -> ApiError {
    ApiError::invalid(
        "reference_time",
        format!("Error parsing reference_time: '{}' is not a recognized timestamp", raw),
    )
}

/// Drop a trailing `UTC`, `GMT` or `Z` designator.
fn strip_utc_suffix(s: &str) -> &str {
    let upper = s.to_ascii_uppercase();
    for suffix in ["UTC", "GMT", "Z"] {
        if upper.ends_with(suffix) {
            return s[..s.len() - suffix.len()].trim_end();
        }
    }
    s
}

/// Render a reference time as the warehouse timestamp literal body.
pub fn render_reference_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Render a timestamp the way every response carries it.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Analysis-assimilation time range.
///
/// Bounds are opaque literals: they are passed to the warehouse as quoted
/// strings and never parsed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

impl TimeWindow {
    /// Fill absent or blank bounds: `start` from `epoch`, `end` from `now`.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        epoch: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let start = start
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(epoch)
            .to_string();
        let end = end
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format_timestamp(&now));
        Self { start, end }
    }
}
