use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector;
use tracing::debug;

use crate::error::TransportError;
use crate::requests::{Origin, Scheme};

use super::timed::{TimedConnection, idle_timeout_in};
use super::transport::TransportSettings;

trait ConnectionIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> ConnectionIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Dials `origin` and completes the HTTP/1.1 handshake. The connect timeout
/// covers only the TCP dial; everything after it runs under the idle deadlines
/// of [`TimedConnection`].
pub(super) async fn dial(
    origin: &Origin,
    settings: &TransportSettings,
    tls: &TlsConnector,
) -> Result<SendRequest<Full<Bytes>>, TransportError> {
    let addr = origin.authority();
    let stream = match tokio::time::timeout(
        settings.connect_timeout,
        TcpStream::connect((origin.dial_host(), origin.port)),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
        Err(_elapsed) => {
            return Err(TransportError::ConnectTimeout {
                addr,
                timeout: settings.connect_timeout,
            });
        }
    };
    if let Err(err) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", addr, err);
    }

    let timed = TimedConnection::new(stream, settings.read_timeout, settings.write_timeout);
    let io: Box<dyn ConnectionIo> = match origin.scheme {
        Scheme::Http => Box::new(timed),
        Scheme::Https => {
            let secured = tls
                .connect(origin.dial_host(), timed)
                .await
                .map_err(|source| {
                    idle_timeout_in(&source).map_or_else(
                        || TransportError::Tls {
                            host: origin.host.clone(),
                            source,
                        },
                        |direction| TransportError::IdleTimeout { direction },
                    )
                })?;
            Box::new(secured)
        }
    };

    let (sender, connection) = http1::handshake(TokioIo::new(io))
        .await
        .map_err(|source| {
            idle_timeout_in(&source).map_or_else(
                || TransportError::Handshake { source },
                |direction| TransportError::IdleTimeout { direction },
            )
        })?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!("Connection to {} closed: {}", addr, err);
        }
    });

    Ok(sender)
}
