use std::sync::Arc;

use bytes::Bytes;
use http::header::{
    ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, COOKIE, HOST, HeaderMap, HeaderName, HeaderValue,
    USER_AGENT,
};
use http::{Method, Request};
use http_body_util::Full;
use url::Url;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    const fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Connection identity: requests with equal origins may share a kept-alive
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: Scheme,
    /// Host as it appears in a URL (IPv6 literals keep their brackets).
    pub host: String,
    pub port: u16,
}

impl Origin {
    /// Host suitable for DNS lookup and TLS SNI.
    #[must_use]
    pub fn dial_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            self.authority()
        }
    }
}

/// One prepared request. Built during setup and then only read.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: Url,
    origin: Origin,
    target: String,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestSpec {
    /// Builds a request from raw parts. Adds the default `User-Agent` unless
    /// one was supplied.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed URLs, non-HTTP schemes, missing hosts,
    /// or header names/values that are not valid HTTP.
    pub fn new(
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Bytes,
    ) -> Result<Self, ValidationError> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_err| ValidationError::InvalidMethod {
                value: method.to_owned(),
            })?;
        let url = Url::parse(url.trim()).map_err(|err| ValidationError::InvalidUrl {
            url: url.to_owned(),
            source: err,
        })?;
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(ValidationError::UnsupportedScheme {
                    scheme: other.to_owned(),
                });
            }
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ValidationError::UrlMissingHost {
                url: url.to_string(),
            })?
            .to_owned();
        let port = url.port().unwrap_or_else(|| scheme.default_port());

        let mut header_map = HeaderMap::with_capacity(headers.len().saturating_add(1));
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                ValidationError::InvalidHeaderName {
                    header: name.clone(),
                    source: err,
                }
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| ValidationError::InvalidHeaderValue {
                    header: name.clone(),
                    source: err,
                })?;
            header_map.insert(header_name, header_value);
        }
        if !header_map.contains_key(USER_AGENT) {
            header_map.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        let mut target = url.path().to_owned();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        Ok(Self {
            method,
            url,
            origin: Origin { scheme, host, port },
            target,
            headers: header_map,
            body,
        })
    }

    /// Plain `GET` for a URL given on the command line.
    ///
    /// # Errors
    ///
    /// Same as [`RequestSpec::new`].
    pub fn from_url(url: &str) -> Result<Self, ValidationError> {
        Self::new("GET", url, &[], Bytes::new())
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a copy whose `Cookie` header starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error when the combined cookie is not a valid header value.
    pub fn with_cookie_prefix(&self, prefix: &str) -> Result<Self, ValidationError> {
        let existing = self
            .headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let combined = format!("{}{}", prefix, existing);
        let value = HeaderValue::from_str(combined.trim_end()).map_err(|err| {
            ValidationError::InvalidHeaderValue {
                header: COOKIE.as_str().to_owned(),
                source: err,
            }
        })?;
        let mut next = self.clone();
        next.headers.insert(COOKIE, value);
        Ok(next)
    }

    /// Builds the wire request for one exchange.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be assembled.
    pub fn to_request(
        &self,
        keep_alive: bool,
        compression: bool,
    ) -> Result<Request<Full<Bytes>>, http::Error> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(self.target.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.clone_from(&self.headers);
            if !headers.contains_key(HOST)
                && let Ok(host) = HeaderValue::from_str(&self.origin.host_header())
            {
                headers.insert(HOST, host);
            }
            if !keep_alive {
                headers.insert(CONNECTION, HeaderValue::from_static("close"));
            }
            if !headers.contains_key(ACCEPT_ENCODING) {
                let encoding = if compression { "gzip" } else { "identity" };
                headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(encoding));
            }
            if !self.body.is_empty() && !headers.contains_key(CONTENT_LENGTH) {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
            }
        }
        builder.body(Full::new(self.body.clone()))
    }
}

/// Ordered, non-empty collection of requests replayed cyclically. Cloning
/// shares the underlying requests.
#[derive(Debug, Clone)]
pub struct RequestSet {
    specs: Arc<[RequestSpec]>,
}

impl RequestSet {
    /// # Errors
    ///
    /// Returns an error when `specs` is empty.
    pub fn new(specs: Vec<RequestSpec>) -> Result<Self, ValidationError> {
        if specs.is_empty() {
            return Err(ValidationError::EmptyRequestSet);
        }
        Ok(Self {
            specs: specs.into(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Index of the request the `seq`-th job replays.
    #[must_use]
    pub fn slot(&self, seq: u64) -> usize {
        let len = u64::try_from(self.specs.len()).unwrap_or(u64::MAX).max(1);
        usize::try_from(seq.checked_rem(len).unwrap_or(0)).unwrap_or(0)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&RequestSpec> {
        self.specs.get(index)
    }

    #[must_use]
    pub fn specs(&self) -> &[RequestSpec] {
        &self.specs
    }
}
