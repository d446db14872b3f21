use async_channel::Sender;
use tracing::debug;

use crate::domain::run::RunConfig;
use crate::requests::RequestSet;
use crate::shutdown::StopSignal;

use super::super::rate::DispatchTicker;
use super::Job;

/// Replays the request set into the job queue until the request limit is
/// reached or the stop signal fires, then closes the queue.
pub(crate) struct Dispatcher {
    jobs: Sender<Job>,
    requests: RequestSet,
    limit: Option<u64>,
    ticker: Option<DispatchTicker>,
    stop: StopSignal,
}

impl Dispatcher {
    pub(crate) fn new(
        jobs: Sender<Job>,
        requests: RequestSet,
        config: &RunConfig,
        stop: StopSignal,
    ) -> Self {
        Self {
            jobs,
            requests,
            limit: config.stop.max_requests(),
            ticker: config.dispatch_interval().map(DispatchTicker::new),
            stop,
        }
    }

    /// Returns the number of jobs handed to the queue.
    pub(crate) async fn run(mut self) -> u64 {
        let mut seq: u64 = 0;
        while self.limit.is_none_or(|limit| seq < limit) {
            if let Some(ticker) = self.ticker.as_mut() {
                tokio::select! {
                    biased;
                    () = self.stop.raised() => break,
                    () = ticker.wait() => {}
                }
            } else if self.stop.is_raised() {
                break;
            }

            let job = Job {
                seq,
                slot: self.requests.slot(seq),
            };
            tokio::select! {
                biased;
                () = self.stop.raised() => break,
                sent = self.jobs.send(job) => {
                    if sent.is_err() {
                        debug!("Job queue closed by consumers after {} jobs.", seq);
                        break;
                    }
                }
            }
            seq = seq.saturating_add(1);
        }

        self.jobs.close();
        debug!("Dispatcher finished after {} jobs.", seq);
        seq
    }
}
