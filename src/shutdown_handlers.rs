use std::time::Duration;

use tracing::{debug, warn};

use crate::shutdown::{StopReason, StopSignal};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Watches SIGINT (and SIGTERM on unix) and raises the stop. Exits as soon as
/// the stop is raised by anyone.
#[must_use]
pub fn setup_signal_stop_handler(stop: &StopSignal) -> tokio::task::JoinHandle<()> {
    let stop = stop.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = stop.raised() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    if stop.raise(StopReason::Interrupt) {
                        debug!("Interrupt received, stopping run.");
                    }
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    if stop.raise(StopReason::Terminate) {
                        debug!("SIGTERM received, stopping run.");
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = stop.raised() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    if stop.raise(StopReason::Interrupt) {
                        debug!("Interrupt received, stopping run.");
                    }
                }
            }
        }
    })
}

/// Arms the run-duration timer. On expiry it raises the same stop used for
/// manual interruption.
#[must_use]
pub fn setup_duration_timer(stop: &StopSignal, duration: Duration) -> tokio::task::JoinHandle<()> {
    let stop = stop.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = stop.raised() => {}
            () = tokio::time::sleep(duration) => {
                if stop.raise(StopReason::DurationElapsed) {
                    debug!("Run duration of {}s elapsed.", duration.as_secs());
                }
            }
        }
    })
}
