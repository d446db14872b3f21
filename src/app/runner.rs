use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::domain::run::RunConfig;
use crate::error::AppResult;
use crate::http::ExecutorFactory;
use crate::http::workload::{Dispatcher, WorkerContext, spawn_workers};
use crate::metrics::{Report, ResultAggregator};
use crate::requests::RequestSet;
use crate::shutdown::{StopReason, StopSignal};
use crate::shutdown_handlers::{setup_duration_timer, setup_signal_stop_handler};

use super::progress::{NoProgress, ProgressSink};

const PROGRESS_TICK: Duration = Duration::from_secs(1);

/// Result of one run. `stop_reason` is `None` when the run ended by
/// exhausting its request count.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub stop_reason: Option<StopReason>,
    pub dispatched: u64,
}

/// Drives one run from first dispatch to the finished report.
pub struct RunController<F> {
    config: RunConfig,
    requests: RequestSet,
    factory: F,
    stop: StopSignal,
    progress: Arc<dyn ProgressSink>,
    watch_signals: bool,
}

impl<F> RunController<F>
where
    F: ExecutorFactory,
{
    #[must_use]
    pub fn new(config: RunConfig, requests: RequestSet, factory: F) -> Self {
        Self {
            config,
            requests,
            factory,
            stop: StopSignal::new(),
            progress: Arc::new(NoProgress),
            watch_signals: false,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Lets SIGINT and SIGTERM raise the stop signal.
    #[must_use]
    pub const fn watch_signals(mut self, enabled: bool) -> Self {
        self.watch_signals = enabled;
        self
    }

    /// Handle for raising the stop from outside the run.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs to completion or until the stop signal fires, then aggregates
    /// whatever the workers returned. Per-request failures never make this
    /// fail.
    ///
    /// # Errors
    ///
    /// Returns an error only when the aggregator cannot be created, which
    /// happens before any request is sent.
    pub async fn run(self) -> AppResult<RunOutcome> {
        let Self {
            config,
            requests,
            factory,
            stop,
            progress,
            watch_signals,
        } = self;

        let mut aggregator = ResultAggregator::new(config.accepted.clone(), config.keep_samples)?;
        let timed = config.stop.is_timed();
        let run_start = Instant::now();
        progress.start(config.stop.progress_total());
        info!(
            "Starting run: {} workers, {} distinct request(s).",
            config.workers,
            requests.len()
        );

        let mut side_tasks: Vec<JoinHandle<()>> = Vec::new();
        if watch_signals {
            side_tasks.push(setup_signal_stop_handler(&stop));
        }
        if let Some(duration) = config.stop.max_duration() {
            side_tasks.push(setup_duration_timer(&stop, duration));
        }
        if timed {
            side_tasks.push(spawn_progress_ticker(Arc::clone(&progress), stop.clone()));
        }

        let (jobs_tx, jobs_rx) = async_channel::bounded(config.queue_capacity());
        let context = Arc::new(WorkerContext {
            requests: requests.clone(),
            accepted: config.accepted.clone(),
            stop: stop.clone(),
            progress: (!timed).then(|| Arc::clone(&progress)),
            run_start,
        });
        let workers = spawn_workers(&factory, config.workers, &jobs_rx, &context);
        drop(jobs_rx);
        let dispatcher =
            tokio::spawn(Dispatcher::new(jobs_tx, requests, &config, stop.clone()).run());

        // Buffers become readable only once every worker has returned.
        let finished = join_all(workers).await;
        let dispatched = dispatcher.await.unwrap_or_else(|err| {
            warn!("Dispatcher task failed: {}", err);
            0
        });

        for task in side_tasks {
            task.abort();
        }
        progress.finish();

        for joined in finished {
            match joined {
                Ok(buffer) => aggregator.ingest(&buffer),
                Err(err) => warn!("Worker task failed, its results are lost: {}", err),
            }
        }
        let report = aggregator.finish(run_start.elapsed());

        let stop_reason = stop.reason();
        match stop_reason {
            Some(reason) => info!("Run stopped early: {}.", reason.as_str()),
            None => debug!("Run finished after {} dispatched jobs.", dispatched),
        }

        Ok(RunOutcome {
            report,
            stop_reason,
            dispatched,
        })
    }
}

/// Duration-mode progress: one tick per elapsed second, independent of how
/// many requests completed.
fn spawn_progress_ticker(progress: Arc<dyn ProgressSink>, stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let now = Instant::now();
        let first = now.checked_add(PROGRESS_TICK).unwrap_or(now);
        let mut ticker = interval_at(first, PROGRESS_TICK);
        loop {
            tokio::select! {
                biased;
                () = stop.raised() => break,
                _ = ticker.tick() => progress.increment(),
            }
        }
    })
}
