use std::time::Duration;

use tracing::debug;

use crate::domain::run::AcceptedStatus;
use crate::error::MetricsError;

use super::histogram::LatencyHistogram;
use super::types::{PlotSample, Report, RequestResult, WorkerResultBuffer};

/// Scale for two-decimal fixed-point rates.
const RATE_SCALE: u128 = 100;
const MS_PER_SEC: u128 = 1_000;

/// Single-pass reducer over finished worker buffers. Every tally is a
/// commutative sum (or min/max), so the order buffers arrive in does not
/// affect the report.
#[derive(Debug)]
pub struct ResultAggregator {
    accepted: AcceptedStatus,
    keep_samples: bool,
    histogram: LatencyHistogram,
    report: Report,
    latency_sum_us: u128,
    latency_count: u64,
    min_us: Option<u64>,
}

impl ResultAggregator {
    /// # Errors
    ///
    /// Returns an error if the latency histogram cannot be created.
    pub fn new(accepted: AcceptedStatus, keep_samples: bool) -> Result<Self, MetricsError> {
        Ok(Self {
            accepted,
            keep_samples,
            histogram: LatencyHistogram::new()?,
            report: Report::default(),
            latency_sum_us: 0,
            latency_count: 0,
            min_us: None,
        })
    }

    /// Folds one worker's buffer into the running tallies.
    pub fn ingest(&mut self, buffer: &WorkerResultBuffer) {
        for result in buffer {
            self.record(result);
        }
    }

    fn record(&mut self, result: &RequestResult) {
        self.report.total_requests = self.report.total_requests.saturating_add(1);
        let latency_us = u64::try_from(result.elapsed.as_micros()).unwrap_or(u64::MAX);

        if let Some(error) = result.error.as_ref() {
            let count = self.report.errors.entry(error.clone()).or_insert(0);
            *count = count.saturating_add(1);
            self.report.network_errors = self.report.network_errors.saturating_add(1);
        }
        let success = result.error.is_none() && self.record_response(result, latency_us);

        if self.keep_samples {
            self.report.samples.push(PlotSample {
                elapsed_ms: u64::try_from(result.completed_at.as_millis()).unwrap_or(u64::MAX),
                latency_us,
                success,
            });
        }
    }

    /// Tallies a result that carries a response. Returns whether its status is
    /// accepted.
    fn record_response(&mut self, result: &RequestResult, latency_us: u64) -> bool {
        let report = &mut self.report;
        let count = report.status_codes.entry(result.status).or_insert(0);
        *count = count.saturating_add(1);

        let accepted = self.accepted.contains(result.status);
        if accepted {
            report.total_success = report.total_success.saturating_add(1);
            report.total_bytes = report.total_bytes.saturating_add(result.bytes);
        } else {
            report.status_failures = report.status_failures.saturating_add(1);
        }

        if !self.histogram.record(latency_us) {
            debug!("Dropped latency sample of {}us from quantiles.", latency_us);
        }
        self.latency_sum_us = self.latency_sum_us.saturating_add(u128::from(latency_us));
        self.latency_count = self.latency_count.saturating_add(1);
        self.min_us = Some(self.min_us.map_or(latency_us, |min| min.min(latency_us)));
        report.latency.max_us = report.latency.max_us.max(latency_us);
        accepted
    }

    /// Computes the derived figures and returns the finished report.
    #[must_use]
    pub fn finish(self, elapsed: Duration) -> Report {
        let mut report = self.report;
        let duration_ms = elapsed.as_millis();
        report.duration_ms = u64::try_from(duration_ms).unwrap_or(u64::MAX);

        report.latency.min_us = self.min_us.unwrap_or(0);
        report.latency.avg_us = self
            .latency_sum_us
            .checked_div(u128::from(self.latency_count))
            .and_then(|avg| u64::try_from(avg).ok())
            .unwrap_or(0);
        report.latency.p50_us = self.histogram.quantile(0.5);
        report.latency.p99_us = self.histogram.quantile(0.99);

        let success = u128::from(report.total_success);
        let total = u128::from(report.total_requests);
        report.availability_x100 = scaled_ratio(success, 10_000, total);
        let per_second = RATE_SCALE.saturating_mul(MS_PER_SEC);
        report.success_rate_x100 = scaled_ratio(success, per_second, duration_ms);
        report.rps_x100 = scaled_ratio(total, per_second, duration_ms);

        report
            .samples
            .sort_unstable_by_key(|sample| (sample.elapsed_ms, sample.latency_us, sample.success));
        report
    }

    /// Aggregates a set of finished buffers in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the latency histogram cannot be created.
    pub fn aggregate<'buf, I>(
        accepted: AcceptedStatus,
        keep_samples: bool,
        buffers: I,
        elapsed: Duration,
    ) -> Result<Report, MetricsError>
    where
        I: IntoIterator<Item = &'buf WorkerResultBuffer>,
    {
        let mut aggregator = Self::new(accepted, keep_samples)?;
        for buffer in buffers {
            aggregator.ingest(buffer);
        }
        Ok(aggregator.finish(elapsed))
    }
}

fn scaled_ratio(numerator: u128, scale: u128, denominator: u128) -> u64 {
    numerator
        .saturating_mul(scale)
        .checked_div(denominator)
        .map_or(0, |value| u64::try_from(value).unwrap_or(u64::MAX))
}
