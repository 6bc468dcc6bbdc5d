use chrono::{DateTime, Duration, Timelike, Utc};

use crate::config::IntervalParams;
use crate::error::ConfigError;
use attribution_core::ScheduledInterval;

/// Explicit bounds when both are given, otherwise the last completed hour
/// before `now`.
pub fn resolve_interval(
    params: &IntervalParams,
    now: DateTime<Utc>,
) -> Result<ScheduledInterval, ConfigError> {
    match (params.start.as_deref(), params.end.as_deref()) {
        (Some(start), Some(end)) => {
            let start = parse_rfc3339_utc(start)?;
            let end = parse_rfc3339_utc(end)?;
            if end <= start {
                return Err(ConfigError::InvalidInterval(format!(
                    "end {} is not after start {}",
                    end.to_rfc3339(),
                    start.to_rfc3339()
                )));
            }
            Ok(ScheduledInterval { start, end })
        }
        (None, None) => previous_hour(now),
        _ => Err(ConfigError::InvalidInterval(
            "interval start and end must be given together".to_string(),
        )),
    }
}

pub fn previous_hour(now: DateTime<Utc>) -> Result<ScheduledInterval, ConfigError> {
    let end = now
        .with_nanosecond(0)
        .and_then(|ts| ts.with_second(0))
        .and_then(|ts| ts.with_minute(0))
        .ok_or_else(|| ConfigError::InvalidInterval(format!("cannot truncate {}", now)))?;
    Ok(ScheduledInterval {
        start: end - Duration::hours(1),
        end,
    })
}

pub fn parse_rfc3339_utc(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| ConfigError::InvalidInterval(format!("invalid datetime {}: {}", value, err)))
}
