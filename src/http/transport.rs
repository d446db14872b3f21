use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use http::header::CONNECTION;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1::SendRequest;
use tokio_native_tls::TlsConnector;

use crate::domain::run::RunConfig;
use crate::error::{HttpError, TransportError};
use crate::requests::{Origin, RequestSpec};

use super::connect::dial;
use super::timed::idle_timeout_in;
use super::tls::build_insecure_connector;
use super::workload::{ExchangeOutcome, ExecutorFactory, RequestExecutor};

/// Connection policy shared by every worker's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub keep_alive: bool,
    pub compression: bool,
}

impl From<&RunConfig> for TransportSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            keep_alive: config.keep_alive,
            compression: config.compression,
        }
    }
}

/// A completed HTTP exchange. The body has been read to the end.
#[derive(Debug)]
pub struct Exchange {
    pub status: u16,
    pub headers: HeaderMap,
    pub body_bytes: u64,
}

/// Single-owner HTTP/1.1 client. Each worker owns one, so the idle connection
/// cache needs no locking.
pub struct Transport {
    settings: TransportSettings,
    tls: TlsConnector,
    idle: HashMap<Origin, SendRequest<Full<Bytes>>>,
}

impl Transport {
    #[must_use]
    pub fn new(settings: TransportSettings, tls: TlsConnector) -> Self {
        Self {
            settings,
            tls,
            idle: HashMap::new(),
        }
    }

    /// Sends one request and drains its body.
    ///
    /// # Errors
    ///
    /// Returns the transport failure (dial, TLS, idle timeout, protocol) when
    /// no complete response was received.
    pub async fn exchange(&mut self, spec: &RequestSpec) -> Result<Exchange, TransportError> {
        let request = spec
            .to_request(self.settings.keep_alive, self.settings.compression)
            .map_err(|source| TransportError::BuildRequest { source })?;
        let mut sender = self.checkout(spec.origin()).await?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|source| classify(source, |source| TransportError::Request { source }))?;
        let (parts, body) = response.into_parts();
        let body_bytes = drain_body(body)
            .await
            .map_err(|source| classify(source, |source| TransportError::Body { source }))?;

        if self.settings.keep_alive && !asks_to_close(&parts.headers) {
            self.idle.insert(spec.origin().clone(), sender);
        }

        Ok(Exchange {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body_bytes,
        })
    }

    async fn checkout(
        &mut self,
        origin: &Origin,
    ) -> Result<SendRequest<Full<Bytes>>, TransportError> {
        if let Some(mut sender) = self.idle.remove(origin)
            && !sender.is_closed()
            && sender.ready().await.is_ok()
        {
            return Ok(sender);
        }
        dial(origin, &self.settings, &self.tls).await
    }
}

#[async_trait]
impl RequestExecutor for Transport {
    async fn execute(&mut self, spec: &RequestSpec) -> Result<ExchangeOutcome, TransportError> {
        let exchange = self.exchange(spec).await?;
        Ok(ExchangeOutcome {
            status: exchange.status,
            body_bytes: exchange.body_bytes,
        })
    }
}

/// Builds one [`Transport`] per worker around a shared TLS connector.
#[derive(Clone)]
pub struct TransportFactory {
    settings: TransportSettings,
    tls: TlsConnector,
}

impl TransportFactory {
    /// # Errors
    ///
    /// Returns an error when the TLS connector cannot be built.
    pub fn new(settings: TransportSettings) -> Result<Self, HttpError> {
        Ok(Self {
            settings,
            tls: build_insecure_connector()?,
        })
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        Transport::new(self.settings, self.tls.clone())
    }
}

impl ExecutorFactory for TransportFactory {
    type Executor = Transport;

    fn build(&self, _worker_id: usize) -> Transport {
        self.transport()
    }
}

async fn drain_body(mut body: Incoming) -> Result<u64, hyper::Error> {
    let mut total = 0u64;
    while let Some(frame) = body.frame().await {
        if let Some(data) = frame?.data_ref() {
            total = total.saturating_add(u64::try_from(data.len()).unwrap_or(u64::MAX));
        }
    }
    Ok(total)
}

fn asks_to_close(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}

fn classify<F>(source: hyper::Error, wrap: F) -> TransportError
where
    F: FnOnce(hyper::Error) -> TransportError,
{
    idle_timeout_in(&source).map_or_else(
        || wrap(source),
        |direction| TransportError::IdleTimeout { direction },
    )
}
