use tokio_native_tls::TlsConnector;

use crate::error::HttpError;

/// TLS connector that skips certificate and hostname verification. Load
/// targets are routinely self-signed, so verification is off on purpose.
///
/// # Errors
///
/// Returns an error when the platform TLS backend cannot be initialised.
pub(crate) fn build_insecure_connector() -> Result<TlsConnector, HttpError> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|source| HttpError::BuildTlsConnector { source })?;
    Ok(TlsConnector::from(connector))
}
