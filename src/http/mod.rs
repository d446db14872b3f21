//! HTTP/1.1 transport with idle-timed connections, plus the dispatcher and
//! worker pool that drive it.
mod connect;
mod rate;
mod timed;
mod tls;
mod transport;
pub(crate) mod workload;


pub use timed::TimedConnection;
pub use transport::{Exchange, Transport, TransportFactory, TransportSettings};
pub use workload::{ExchangeOutcome, ExecutorFactory, RequestExecutor};
