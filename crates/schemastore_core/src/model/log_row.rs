//! Log row model and inclusive timestamp ranges.
//!
//! # Responsibility
//! - Carry opaque log rows while exposing the `timestamp` column.
//! - Format range bounds the way the remote query filter expects.
//!
//! # Invariants
//! - `LogRange` bounds are inclusive on both ends.
//! - Bounds are rendered as RFC 3339 in UTC with a `Z` suffix.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column used for range filtering.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// One row of the log table.
///
/// Every column other than `timestamp` is kept in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRow {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            fields: Map::new(),
        }
    }

    /// Adds or replaces one column value.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the `status` column when it is a string.
    pub fn status(&self) -> Option<&str> {
        self.field("status").and_then(Value::as_str)
    }

    /// Parses `timestamp` as a UTC instant.
    ///
    /// Accepts RFC 3339 with any offset, or a naive ISO timestamp taken as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Inclusive `[start, end]` timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LogRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Covers every instant from the first day's midnight to the last
    /// microsecond of `last_day`.
    pub fn whole_days(first_day: NaiveDate, last_day: NaiveDate) -> Self {
        let start = first_day.and_time(NaiveTime::MIN).and_utc();
        let end = last_day
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(TimeDelta::days(1) - TimeDelta::microseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// Lower bound as sent in the `gte` filter.
    pub fn gte_bound(&self) -> String {
        format_bound(self.start)
    }

    /// Upper bound as sent in the `lte` filter.
    pub fn lte_bound(&self) -> String {
        format_bound(self.end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn format_bound(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Postgres `timestamp` (no tz) columns render with a space or `T`.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}
