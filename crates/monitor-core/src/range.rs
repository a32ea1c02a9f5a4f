//! Time ranges requested by the dashboard

use crate::error::{MonitorError, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First day shown by a freshly opened dashboard
const DASHBOARD_START: (i32, u32, u32) = (2023, 1, 1);

/// Closed interval `[start, end]` of UTC instants
///
/// Always satisfies `start <= end`. The fields are private so the invariant
/// holds for every value in circulation; a view replaces its range wholesale
/// instead of editing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(MonitorError::InvalidRange(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Range from `start` up to now
    pub fn since(start: DateTime<Utc>) -> Result<Self> {
        Self::new(start, Utc::now())
    }

    /// The range a dashboard opens with: 2023-01-01 until now
    pub fn dashboard_default() -> Self {
        let (y, m, d) = DASHBOARD_START;
        let start = Utc
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = Utc::now().max(start);
        Self { start, end }
    }

    /// Parse both bounds from `YYYY-MM-DD` or RFC 3339 strings
    ///
    /// A bare date as the end bound means the end of that day.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_instant(start, false)?;
        let end = parse_instant(end, true)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `instant` falls inside the range (both ends inclusive)
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Calendar quarter of the end bound, e.g. `2024Q2`
    pub fn quarter_label(&self) -> String {
        quarter_label(self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// Deserialization goes through `new` so the ordering invariant cannot be bypassed.
impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

/// Calendar quarter label for an instant, e.g. `2024Q1`
pub fn quarter_label(instant: DateTime<Utc>) -> String {
    format!("{}Q{}", instant.year(), (instant.month() - 1) / 3 + 1)
}

fn parse_instant(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| MonitorError::InvalidRange(format!("cannot parse '{raw}': {e}")))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };

    time.map(|t| t.and_utc())
        .ok_or_else(|| MonitorError::InvalidRange(format!("cannot parse '{raw}'")))
}
