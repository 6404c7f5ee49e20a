use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::error::SchedulerError;

/// Error produced by a feed action. Opaque to the scheduler: only the
/// success/failure of the attempt is inspected, never the payload.
pub type FeedError = Box<dyn std::error::Error + Send + Sync>;

/// Completion signal of one feed attempt.
pub type FeedResult = Result<(), FeedError>;

/// Handler signature for feeds registered through `#[feed]`.
pub type FeedHandler = fn() -> Pin<Box<dyn Future<Output = FeedResult> + Send>>;

/// Time unit for interval-based scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl FromStr for TimeUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "milliseconds" | "millisecond" | "millis" | "milli" | "ms" => Ok(TimeUnit::Milliseconds),
            "seconds" | "second" | "s" | "sec" => Ok(TimeUnit::Seconds),
            "minutes" | "minute" | "m" | "min" => Ok(TimeUnit::Minutes),
            "hours" | "hour" | "h" | "hr" => Ok(TimeUnit::Hours),
            "days" | "day" | "d" => Ok(TimeUnit::Days),
            _ => Err(()),
        }
    }
}

impl TimeUnit {
    pub fn to_millis(&self, value: u64) -> u64 {
        match self {
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value * 1000,
            TimeUnit::Minutes => value * 60_000,
            TimeUnit::Hours => value * 3_600_000,
            TimeUnit::Days => value * 86_400_000,
        }
    }

    /// Parse a duration string like "5s", "10m", "2h", "500ms"
    /// Returns (value, TimeUnit) if successful
    pub fn parse_duration(s: &str) -> Option<(u64, TimeUnit)> {
        let s = s.trim();

        let mut split_pos = 0;
        for (i, c) in s.chars().enumerate() {
            if !c.is_ascii_digit() {
                split_pos = i;
                break;
            }
        }

        if split_pos == 0 || split_pos == s.len() {
            return None;
        }

        let (num_str, unit_str) = s.split_at(split_pos);
        let value = num_str.parse::<u64>().ok()?;
        let time_unit = unit_str.parse().ok()?;

        Some((value, time_unit))
    }
}

/// Resolve an already config-expanded interval spec to milliseconds.
///
/// Accepts shorthand ("500ms", "30s", "5m") or a plain number interpreted
/// in `default_unit`. An interval of zero is rejected: every feed needs a
/// real polling period.
pub(crate) fn parse_interval_spec(
    feed: &str,
    spec: &str,
    default_unit: TimeUnit,
) -> Result<u64, SchedulerError> {
    let millis = if let Some((value, unit)) = TimeUnit::parse_duration(spec) {
        unit.to_millis(value)
    } else {
        let value = spec.parse::<u64>().map_err(|_| SchedulerError::InvalidInterval {
            feed: feed.to_string(),
            value: spec.to_string(),
        })?;
        default_unit.to_millis(value)
    };

    if millis == 0 {
        return Err(SchedulerError::InvalidInterval {
            feed: feed.to_string(),
            value: spec.to_string(),
        });
    }

    Ok(millis)
}

/// Represents a feed collected through the `#[feed]` attribute.
///
/// Schedule and enabled values are kept as raw strings so that config
/// placeholders like `${feeds.market.interval}` survive until the builder
/// resolves them.
#[derive(Debug, Clone)]
pub struct FeedDef {
    pub name: &'static str,
    pub schedule_type: &'static str,
    pub schedule_value: &'static str,
    pub enabled: &'static str,
    pub time_unit: &'static str,
    pub handler: FeedHandler,
}
