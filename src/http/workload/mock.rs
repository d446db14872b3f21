use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::ProgressSink;
use crate::error::{IdleDirection, TransportError};
use crate::requests::RequestSpec;

use super::{ExchangeOutcome, ExecutorFactory, RequestExecutor};

/// Scripted reply for one call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    pub(crate) delay: Duration,
    pub(crate) reply: Result<ExchangeOutcome, IdleDirection>,
}

impl Step {
    pub(crate) const fn ok(status: u16, body_bytes: u64) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(ExchangeOutcome { status, body_bytes }),
        }
    }

    pub(crate) const fn idle(direction: IdleDirection) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Err(direction),
        }
    }

    pub(crate) const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Script = dyn Fn(u64) -> Step + Send + Sync;

/// Executors that answer from a script keyed by the global call index and
/// record the request paths they were asked for.
#[derive(Clone)]
pub(crate) struct ScriptedFactory {
    script: Arc<Script>,
    calls: Arc<AtomicU64>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFactory {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(u64) -> Step + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            calls: Arc::new(AtomicU64::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn always(step: Step) -> Self {
        Self::new(move |_call| step)
    }

    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

pub(crate) struct ScriptedExecutor {
    factory: ScriptedFactory,
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(&mut self, spec: &RequestSpec) -> Result<ExchangeOutcome, TransportError> {
        let call = self.factory.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.factory.seen.lock() {
            seen.push(spec.url().path().to_owned());
        }
        let step = (self.factory.script)(call);
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.reply
            .map_err(|direction| TransportError::IdleTimeout { direction })
    }
}

impl ExecutorFactory for ScriptedFactory {
    type Executor = ScriptedExecutor;

    fn build(&self, _worker_id: usize) -> ScriptedExecutor {
        ScriptedExecutor {
            factory: self.clone(),
        }
    }
}

/// Progress sink that only counts events.
#[derive(Debug, Default)]
pub(crate) struct CountingProgress {
    pub(crate) total: AtomicU64,
    pub(crate) ticks: AtomicU64,
    pub(crate) finished: AtomicU64,
}

impl ProgressSink for CountingProgress {
    fn start(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn increment(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}
