//! Per-request results, the latency histogram, and the single-pass
//! aggregation that turns worker buffers into a [`Report`].
mod aggregate;
mod histogram;
mod types;


pub use aggregate::ResultAggregator;
pub use histogram::LatencyHistogram;
pub use types::{LatencyStats, PlotSample, Report, RequestResult, WorkerResultBuffer};
