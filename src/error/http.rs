use std::time::Duration;

use thiserror::Error;

/// Setup-time failures of the HTTP layer. These abort the run before any
/// worker starts.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build TLS connector: {source}")]
    BuildTlsConnector {
        #[source]
        source: native_tls::Error,
    },
    #[error("Failed to read request file '{path}': {source}")]
    ReadRequestFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleDirection {
    Read,
    Write,
}

impl IdleDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            IdleDirection::Read => "read",
            IdleDirection::Write => "write",
        }
    }
}

/// Failure of a single request. Recorded in the worker's result buffer and
/// tallied by message text; never propagated out of the worker.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("dial {addr}: connect timeout after {}ms", .timeout.as_millis())]
    ConnectTimeout { addr: String, timeout: Duration },
    #[error("dial {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tls handshake with {host}: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("{} timeout", .direction.as_str())]
    IdleTimeout { direction: IdleDirection },
    #[error("http handshake: {source}")]
    Handshake {
        #[source]
        source: hyper::Error,
    },
    #[error("request failed: {source}")]
    Request {
        #[source]
        source: hyper::Error,
    },
    #[error("reading body: {source}")]
    Body {
        #[source]
        source: hyper::Error,
    },
    #[error("invalid request: {source}")]
    BuildRequest {
        #[source]
        source: http::Error,
    },
}
