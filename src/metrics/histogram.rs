use hdrhistogram::Histogram;

use crate::error::MetricsError;

/// Bounded-memory latency quantiles in microseconds. Three significant digits
/// keep the relative error of any quantile under 0.1%.
#[derive(Debug)]
pub struct LatencyHistogram {
    hist: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a new auto-resizing latency histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let hist =
            Histogram::<u64>::new(3).map_err(|source| MetricsError::CreateHistogram { source })?;
        Ok(Self { hist })
    }

    /// Records one latency. Zero is clamped to 1us; a value the histogram
    /// rejects is dropped and reported as `false`.
    pub fn record(&mut self, latency_us: u64) -> bool {
        self.hist.record(latency_us.max(1)).is_ok()
    }

    #[must_use]
    pub fn quantile(&self, quantile: f64) -> u64 {
        if self.hist.is_empty() {
            return 0;
        }
        self.hist.value_at_quantile(quantile)
    }
}
