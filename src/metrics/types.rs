use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Outcome of one executed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestResult {
    /// `0` when the request failed before a response arrived.
    pub status: u16,
    /// Request start until the body was fully drained, or until the failure.
    pub elapsed: Duration,
    pub error: Option<String>,
    /// Body size; only counted for accepted statuses.
    pub bytes: u64,
    /// Completion time relative to run start.
    pub completed_at: Duration,
}

impl RequestResult {
    #[must_use]
    pub const fn response(
        status: u16,
        elapsed: Duration,
        bytes: u64,
        completed_at: Duration,
    ) -> Self {
        Self {
            status,
            elapsed,
            error: None,
            bytes,
            completed_at,
        }
    }

    #[must_use]
    pub const fn failure(error: String, elapsed: Duration, completed_at: Duration) -> Self {
        Self {
            status: 0,
            elapsed,
            error: Some(error),
            bytes: 0,
            completed_at,
        }
    }
}

/// Append-only results of one worker, in that worker's completion order.
/// Moved out of the worker only when the worker finishes.
#[derive(Debug, Default)]
pub struct WorkerResultBuffer {
    results: Vec<RequestResult>,
}

impl WorkerResultBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: RequestResult) {
        self.results.push(result);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RequestResult> {
        self.results.iter()
    }
}

impl From<Vec<RequestResult>> for WorkerResultBuffer {
    fn from(results: Vec<RequestResult>) -> Self {
        Self { results }
    }
}

impl<'buf> IntoIterator for &'buf WorkerResultBuffer {
    type Item = &'buf RequestResult;
    type IntoIter = std::slice::Iter<'buf, RequestResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Latency summary in microseconds over non-error results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    pub min_us: u64,
    pub avg_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// One plotted point for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlotSample {
    pub elapsed_ms: u64,
    pub latency_us: u64,
    pub success: bool,
}

/// Final aggregate of a run. Built once and never modified.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub status_codes: BTreeMap<u16, u64>,
    pub errors: BTreeMap<String, u64>,
    pub total_requests: u64,
    pub total_success: u64,
    /// Responses outside the accepted status range.
    pub status_failures: u64,
    /// Results that carry an error instead of a response.
    pub network_errors: u64,
    pub latency: LatencyStats,
    pub total_bytes: u64,
    pub duration_ms: u64,
    /// Successful share of all requests, percent x100.
    pub availability_x100: u64,
    /// Successful requests per second x100.
    pub success_rate_x100: u64,
    /// All requests per second x100.
    pub rps_x100: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<PlotSample>,
}

impl Report {
    #[must_use]
    pub const fn total_failure(&self) -> u64 {
        self.status_failures.saturating_add(self.network_errors)
    }
}
