use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupt,
    Terminate,
    DurationElapsed,
}

impl StopReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StopReason::Interrupt => "interrupt",
            StopReason::Terminate => "terminate",
            StopReason::DurationElapsed => "duration elapsed",
        }
    }
}

/// Single-fire external stop shared by the signal watcher, the duration timer,
/// the dispatcher and every worker.
///
/// The first `raise` wins and records its reason; any later raise is a no-op.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the stop. Returns `true` only for the call that actually fired it.
    #[must_use]
    pub fn raise(&self, reason: StopReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    pub async fn raised(&self) {
        self.token.cancelled().await;
    }
}
