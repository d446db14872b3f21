use http::HeaderMap;
use http::header::SET_COOKIE;
use tracing::{debug, warn};

use crate::http::Transport;

use super::spec::RequestSpec;

/// Renders every `Set-Cookie` pair as `name=value; `, ready to prepend to a
/// `Cookie` header. Attributes such as `Path` are dropped.
#[must_use]
pub fn cookie_prefix(headers: &HeaderMap) -> String {
    let mut prefix = String::new();
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        let pair = raw.split(';').next().unwrap_or_default().trim();
        if let Some((name, cookie_value)) = pair.split_once('=')
            && !name.trim().is_empty()
        {
            prefix.push_str(name.trim());
            prefix.push('=');
            prefix.push_str(cookie_value.trim());
            prefix.push_str("; ");
        }
    }
    prefix
}

/// Executes the login request once and returns the cookie prefix it yielded.
/// A failed login is logged and yields `None`; the run goes on without cookies.
pub async fn perform_login(transport: &mut Transport, login: &RequestSpec) -> Option<String> {
    match transport.exchange(login).await {
        Ok(exchange) => {
            let prefix = cookie_prefix(&exchange.headers);
            debug!(
                "Login to {} returned status {} with {} byte cookie prefix.",
                login.url(),
                exchange.status,
                prefix.len()
            );
            (!prefix.is_empty()).then_some(prefix)
        }
        Err(err) => {
            warn!("Login request to {} failed: {}", login.url(), err);
            None
        }
    }
}
