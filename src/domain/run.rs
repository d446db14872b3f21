use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::ValidationError;

/// Queue slots reserved per worker.
pub const QUEUE_SLOTS_PER_WORKER: usize = 5;

/// When the dispatcher stops producing jobs. At least one bound is always set;
/// with both, whichever is reached first ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopCondition {
    count: Option<u64>,
    duration: Option<Duration>,
}

impl StopCondition {
    /// # Errors
    ///
    /// Returns an error when neither a count nor a duration is given.
    pub const fn new(
        count: Option<u64>,
        duration: Option<Duration>,
    ) -> Result<Self, ValidationError> {
        match (count, duration) {
            (None, None) => Err(ValidationError::MissingStopCondition),
            _ => Ok(Self { count, duration }),
        }
    }

    #[must_use]
    pub const fn count(count: u64) -> Self {
        Self {
            count: Some(count),
            duration: None,
        }
    }

    #[must_use]
    pub const fn duration(duration: Duration) -> Self {
        Self {
            count: None,
            duration: Some(duration),
        }
    }

    #[must_use]
    pub const fn max_requests(&self) -> Option<u64> {
        self.count
    }

    #[must_use]
    pub const fn max_duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Duration-style progress (one tick per second) applies whenever a
    /// duration bound is present.
    #[must_use]
    pub const fn is_timed(&self) -> bool {
        self.duration.is_some()
    }

    /// Number of progress ticks that represent a complete run.
    #[must_use]
    pub fn progress_total(&self) -> u64 {
        match (self.duration, self.count) {
            (Some(duration), _) => duration.as_secs().max(1),
            (None, Some(count)) => count,
            (None, None) => 0,
        }
    }
}

/// Inclusive status range treated as success for tallies and byte counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedStatus(RangeInclusive<u16>);

impl AcceptedStatus {
    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        Self(min..=max)
    }

    #[must_use]
    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

impl Default for AcceptedStatus {
    fn default() -> Self {
        Self::new(200, 302)
    }
}

/// Everything the engine needs for one run, built once before any worker
/// starts and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub stop: StopCondition,
    pub workers: usize,
    /// Requests per second; `None` dispatches as fast as the queue drains.
    pub rate: Option<u64>,
    pub keep_alive: bool,
    pub compression: bool,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub accepted: AcceptedStatus,
    /// Retain per-request samples in the report for export.
    pub keep_samples: bool,
}

impl RunConfig {
    #[must_use]
    pub fn new(stop: StopCondition, workers: usize) -> Self {
        Self {
            stop,
            workers: workers.max(1),
            rate: None,
            keep_alive: true,
            compression: true,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            accepted: AcceptedStatus::default(),
            keep_samples: false,
        }
    }

    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(QUEUE_SLOTS_PER_WORKER)
    }

    /// Fixed dispatch interval for the configured rate.
    #[must_use]
    pub fn dispatch_interval(&self) -> Option<Duration> {
        self.rate
            .filter(|rate| *rate > 0)
            .map(|rate| Duration::from_micros(1_000_000u64.checked_div(rate).unwrap_or(1).max(1)))
    }
}
