//! Sample window computation

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::time::Duration;

/// Window length used when the configured interval is zero
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(300);

/// Fetch delay used when a metric's delay is zero
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(60);

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Half-open `[start, end)` interval queried for one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Exclusive upper bound, `now - delay`
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `interval.startTime` query value (whole seconds, UTC)
    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// `interval.endTime` query value (whole seconds, UTC)
    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Compute the window for a metric: `end = now - delay`, `start = end - interval`
///
/// Zero durations fall back to [`DEFAULT_COLLECTION_INTERVAL`] and
/// [`DEFAULT_FETCH_DELAY`].
pub fn calculate_window(now: DateTime<Utc>, interval: Duration, delay: Duration) -> TimeWindow {
    let interval = if interval.is_zero() {
        DEFAULT_COLLECTION_INTERVAL
    } else {
        interval
    };
    let delay = if delay.is_zero() {
        DEFAULT_FETCH_DELAY
    } else {
        delay
    };

    let end = before(now, delay);
    let start = before(end, interval);
    TimeWindow { start, end }
}

fn before(instant: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(span)
        .ok()
        .and_then(|span| instant.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
