use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior, interval};

/// Fixed-cadence gate for the dispatcher: one job per tick, `1s / rate` apart.
/// A late tick delays the following ones instead of bursting to catch up.
pub(crate) struct DispatchTicker {
    interval: Interval,
}

impl DispatchTicker {
    pub(crate) fn new(period: Duration) -> Self {
        let mut interval = interval(period.max(Duration::from_micros(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub(crate) async fn wait(&mut self) {
        self.interval.tick().await;
    }
}
