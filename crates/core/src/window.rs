use chrono::{DateTime, Duration, Utc};

/// The attribution history view can lag query execution by up to 8 hours.
pub const DEFAULT_LAG_HOURS: u32 = 8;

/// One scheduled run interval, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Lag-shifted `[start, end)` range used to query external queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn lagged(interval: &ScheduledInterval, lag: Duration) -> Self {
        Self {
            start: interval.start - lag,
            end: interval.end - lag,
        }
    }

    pub fn earliest_time(&self) -> String {
        format_rfc3339_micros(&self.start)
    }

    pub fn latest_time(&self) -> String {
        format_rfc3339_micros(&self.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.earliest_time(), self.latest_time())
    }
}

pub fn format_rfc3339_micros(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
