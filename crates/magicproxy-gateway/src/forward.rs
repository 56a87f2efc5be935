//! Upstream forwarding with the proxy's own credential.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use magicproxy_config::{Credential, UpstreamSection};
use thiserror::Error;
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// A sanitized request, ready to send upstream.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Request method.
    pub method: Method,
    /// Path and query, token parameter already removed. Starts with `/`.
    pub path_and_query: String,
    /// Sanitized client headers.
    pub headers: HeaderMap,
    /// Request body, possibly empty.
    pub body: Bytes,
}

/// The upstream reply, before response sanitization.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    /// Upstream status, relayed as is.
    pub status: StatusCode,
    /// Raw upstream headers.
    pub headers: HeaderMap,
    /// Full upstream body.
    pub body: Bytes,
}

/// The upstream call did not produce a response.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection, TLS, read, or timeout failure.
    #[error("upstream unavailable: {reason}")]
    Unavailable {
        /// Client error text, with the URL removed.
        reason: String,
        /// Whether the configured timeout elapsed.
        timed_out: bool,
    },
}

impl ForwardError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        Self::Unavailable {
            timed_out: err.is_timeout(),
            reason: err.without_url().to_string(),
        }
    }

    /// 504 on timeout, otherwise 502.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable {
                timed_out: true, ..
            } => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable identifier for logs and error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable {
                timed_out: true, ..
            } => "upstream_timeout",
            Self::Unavailable { .. } => "upstream_unavailable",
        }
    }
}

/// Sends sanitized requests to the upstream API.
///
/// Redirects are never followed; a 3xx is relayed to the client like any
/// other status.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    base_url: String,
    credential: Credential,
    authorization: HeaderValue,
    user_agent: HeaderValue,
}

impl Forwarder {
    /// Forwarder for `base_url` with default timeouts and auth scheme.
    ///
    /// # Errors
    ///
    /// See [`Forwarder::from_config`].
    pub fn new(base_url: &str, credential: Credential) -> GatewayResult<Self> {
        let upstream = UpstreamSection {
            base_url: base_url.to_owned(),
            ..UpstreamSection::default()
        };
        Self::from_config(&upstream, credential)
    }

    /// Build from the `[upstream]` section.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the base URL is not an absolute
    /// `http(s)` URL, or the credential or user agent is not a valid header
    /// value, and [`GatewayError::Client`] if the HTTP client cannot be built.
    pub fn from_config(upstream: &UpstreamSection, credential: Credential) -> GatewayResult<Self> {
        let parsed = Url::parse(&upstream.base_url).map_err(|e| {
            GatewayError::Config(format!("invalid upstream base_url '{}': {e}", upstream.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::Config(format!(
                "upstream base_url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let mut authorization =
            HeaderValue::from_str(&format!("{} {}", upstream.auth_scheme, credential.expose()))
                .map_err(|_| {
                    GatewayError::Config("upstream credential is not a valid header value".into())
                })?;
        authorization.set_sensitive(true);

        let user_agent = match &upstream.user_agent {
            Some(ua) => HeaderValue::from_str(ua)
                .map_err(|_| GatewayError::Config(format!("invalid user_agent '{ua}'")))?,
            None => HeaderValue::from_static(concat!("magicproxy/", env!("CARGO_PKG_VERSION"))),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_secs))
            .connect_timeout(Duration::from_secs(upstream.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: upstream.base_url.trim_end_matches('/').to_owned(),
            credential,
            authorization,
            user_agent,
        })
    }

    /// The upstream base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credential injected into every request.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Absolute upstream URL for a request path.
    #[must_use]
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.base_url)
    }

    /// Send `request` upstream and read the full response.
    ///
    /// Any status, including 4xx, 5xx and 3xx, is a successful forward.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Unavailable`] if no complete response arrives.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, ForwardError> {
        let ProxyRequest {
            method,
            path_and_query,
            mut headers,
            body,
        } = request;

        headers.insert(AUTHORIZATION, self.authorization.clone());
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, self.user_agent.clone());
        }

        let mut builder = self
            .client
            .request(method, self.target_url(&path_and_query))
            .headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(ForwardError::from_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(ForwardError::from_reqwest)?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "upstream responded");

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}
