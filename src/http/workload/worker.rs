use std::sync::Arc;

use async_channel::Receiver;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::app::ProgressSink;
use crate::domain::run::AcceptedStatus;
use crate::metrics::{RequestResult, WorkerResultBuffer};
use crate::requests::RequestSet;
use crate::shutdown::StopSignal;

use super::{ExecutorFactory, Job, RequestExecutor};

/// Read-only state shared by every worker of a run.
pub(crate) struct WorkerContext {
    pub(crate) requests: RequestSet,
    pub(crate) accepted: AcceptedStatus,
    pub(crate) stop: StopSignal,
    /// Present only in count mode, where every completion is a progress tick.
    pub(crate) progress: Option<Arc<dyn ProgressSink>>,
    pub(crate) run_start: Instant,
}

/// Starts `count` workers. Each handle yields that worker's buffer once the
/// queue is closed and drained, or once the stop signal fires.
pub(crate) fn spawn_workers<F>(
    factory: &F,
    count: usize,
    jobs: &Receiver<Job>,
    context: &Arc<WorkerContext>,
) -> Vec<JoinHandle<WorkerResultBuffer>>
where
    F: ExecutorFactory,
{
    (0..count)
        .map(|worker_id| {
            let executor = factory.build(worker_id);
            let jobs = jobs.clone();
            let context = Arc::clone(context);
            tokio::spawn(run_worker(worker_id, executor, jobs, context))
        })
        .collect()
}

async fn run_worker<E>(
    worker_id: usize,
    mut executor: E,
    jobs: Receiver<Job>,
    context: Arc<WorkerContext>,
) -> WorkerResultBuffer
where
    E: RequestExecutor,
{
    let mut buffer = WorkerResultBuffer::new();
    loop {
        let job = tokio::select! {
            biased;
            () = context.stop.raised() => break,
            received = jobs.recv() => match received {
                Ok(job) => job,
                Err(_closed) => break,
            },
        };
        let Some(spec) = context.requests.get(job.slot) else {
            continue;
        };

        let started = Instant::now();
        // A stop abandons the in-flight request; its result is lost.
        let outcome = tokio::select! {
            biased;
            () = context.stop.raised() => break,
            outcome = executor.execute(spec) => outcome,
        };
        let elapsed = started.elapsed();
        let completed_at = context.run_start.elapsed();

        let result = outcome.map_or_else(
            |err| {
                debug!("Worker {} job {} failed: {}", worker_id, job.seq, err);
                RequestResult::failure(err.to_string(), elapsed, completed_at)
            },
            |exchange| {
                let bytes = if context.accepted.contains(exchange.status) {
                    exchange.body_bytes
                } else {
                    0
                };
                RequestResult::response(exchange.status, elapsed, bytes, completed_at)
            },
        );
        buffer.push(result);

        if let Some(progress) = context.progress.as_ref() {
            progress.increment();
        }
    }

    debug!("Worker {} exiting with {} results.", worker_id, buffer.len());
    buffer
}
