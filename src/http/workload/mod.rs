//! Job distribution and the worker pool.
//!
//! The dispatcher is the single producer of a bounded queue; workers race to
//! consume it and each keeps its own result buffer until it exits.
mod dispatcher;
mod worker;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::requests::RequestSpec;

pub(crate) use dispatcher::Dispatcher;
pub(crate) use worker::{WorkerContext, spawn_workers};

/// One dispatched replay of the request at `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Job {
    pub(crate) seq: u64,
    pub(crate) slot: usize,
}

/// What a worker needs to know about a finished exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub status: u16,
    pub body_bytes: u64,
}

/// Executes requests for exactly one worker.
#[async_trait]
pub trait RequestExecutor: Send {
    /// # Errors
    ///
    /// Returns the transport failure when no complete response arrived.
    async fn execute(&mut self, spec: &RequestSpec) -> Result<ExchangeOutcome, TransportError>;
}

/// Builds one executor per worker before dispatch begins.
pub trait ExecutorFactory: Send + Sync {
    type Executor: RequestExecutor + 'static;

    fn build(&self, worker_id: usize) -> Self::Executor;
}
