//! Header and query sanitization for both legs of the proxy.
//!
//! Every function here is total and deterministic. Header names compare
//! case-insensitively (`HeaderName` is always lowercase); query parameter
//! names compare after form-decoding, so `%6Bey` is the `key` parameter.

use std::borrow::Cow;
use std::collections::HashSet;

use axum::http::header::CONNECTION;
use axum::http::{HeaderMap, HeaderName};
use magicproxy_config::{SanitizeSection, TokenSection};
use thiserror::Error;
use url::form_urlencoded;

use crate::error::{GatewayError, GatewayResult};

/// Hop-by-hop headers (RFC 9110 §7.6.1). Never forwarded in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Client-side headers removed before forwarding, besides hop-by-hop ones.
const REQUEST_STRIP: &[&str] = &[
    // Identity and client authentication
    "authorization",
    "cookie",
    "host",
    "forwarded",
    "x-forwarded-for",
    "x-forwarded-host",
    "x-forwarded-proto",
    "x-real-ip",
    "x-magic-token",
    // Conditional and caching
    "if-none-match",
    "if-modified-since",
    "if-match",
    "if-unmodified-since",
    "if-range",
    "cache-control",
    "pragma",
    // Framing, recomputed by the client library
    "content-length",
    "accept-encoding",
];

/// Upstream headers removed before replying, besides hop-by-hop ones.
const RESPONSE_STRIP: &[&str] = &[
    // Framing, recomputed by the server
    "content-length",
    "content-encoding",
    // Rate limits of the shared credential
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
    "x-ratelimit-used",
    "x-ratelimit-resource",
    // Identity of the shared credential
    "x-oauth-scopes",
    "x-accepted-oauth-scopes",
    "x-oauth-client-id",
    "x-github-sso",
    "github-authentication-token-expiration",
    "set-cookie",
    "server",
];

/// The query string does not parse strictly as `name=value&...`.
///
/// Carries no detail, since the query may contain a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query string is malformed")]
pub struct MalformedQuery;

/// One `name=value` field of a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField<'a> {
    /// The field exactly as received.
    pub raw: &'a str,
    /// Form-decoded name.
    pub name: Cow<'a, str>,
    /// Form-decoded value.
    pub value: Cow<'a, str>,
}

/// Parse a query string (without the leading `?`) strictly.
///
/// Every `&`-separated field must be `name=value` with a non-empty name, and
/// every `%` must begin a two-hex-digit escape.
///
/// # Errors
///
/// Returns [`MalformedQuery`] on the first field that breaks those rules.
pub fn parse_query(query: &str) -> Result<Vec<QueryField<'_>>, MalformedQuery> {
    query
        .split('&')
        .map(|raw| {
            let (name, _) = raw.split_once('=').ok_or(MalformedQuery)?;
            if name.is_empty() || !has_valid_escapes(raw) {
                return Err(MalformedQuery);
            }
            let (name, value) = form_urlencoded::parse(raw.as_bytes())
                .next()
                .ok_or(MalformedQuery)?;
            Ok(QueryField { raw, name, value })
        })
        .collect()
}

fn has_valid_escapes(field: &str) -> bool {
    let mut rest = field;
    while let Some(pos) = rest.find('%') {
        let tail = &rest[pos..];
        match tail.get(1..3) {
            Some(hex) if hex.bytes().all(|b| b.is_ascii_hexdigit()) => rest = &tail[3..],
            _ => return false,
        }
    }
    true
}

/// Remove every query parameter named in `names` from `path`.
///
/// `path` may carry a query and a fragment. Without a query (or with an empty
/// one) it is returned unchanged. Kept fields are re-emitted exactly as
/// received, in order. When nothing is kept the `?` is dropped; a fragment
/// is always preserved.
///
/// # Errors
///
/// Returns [`MalformedQuery`] if the query does not parse strictly.
pub fn clean_path_query_params<S: AsRef<str>>(
    names: &[S],
    path: &str,
) -> Result<String, MalformedQuery> {
    let (before_fragment, fragment) = match path.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (path, None),
    };
    let Some((base, query)) = before_fragment.split_once('?') else {
        return Ok(path.to_owned());
    };
    if query.is_empty() {
        return Ok(path.to_owned());
    }

    let kept: Vec<&str> = parse_query(query)?
        .into_iter()
        .filter(|field| !names.iter().any(|n| n.as_ref() == field.name))
        .map(|field| field.raw)
        .collect();

    let mut out = String::with_capacity(path.len());
    out.push_str(base);
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

/// Whether `path` has a `.` or `..` segment, plain or percent-encoded.
///
/// URL resolution removes such segments before a request goes out, so the
/// upstream path would differ from the one the scope was checked against.
/// Backslashes count as separators, as they do when resolving `http(s)` URLs.
#[must_use]
pub fn has_dot_segment(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.split(['/', '\\']).any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    })
}

/// Names stripped on each leg. Built once at startup, then read-only.
#[derive(Debug, Clone)]
pub struct SanitizationRuleSet {
    request_headers: HashSet<HeaderName>,
    response_headers: HashSet<HeaderName>,
    query_params: Vec<String>,
}

impl SanitizationRuleSet {
    /// Built-in rules, stripping `token_param` from queries.
    #[must_use]
    pub fn new(token_param: impl Into<String>) -> Self {
        let statics = |lists: &[&[&'static str]]| -> HashSet<HeaderName> {
            lists
                .iter()
                .flat_map(|list| list.iter().copied())
                .map(HeaderName::from_static)
                .collect()
        };
        Self {
            request_headers: statics(&[HOP_BY_HOP, REQUEST_STRIP]),
            response_headers: statics(&[HOP_BY_HOP, RESPONSE_STRIP]),
            query_params: vec![token_param.into()],
        }
    }

    /// Built-in rules plus the configured extras.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid header name.
    pub fn from_config(token: &TokenSection, sanitize: &SanitizeSection) -> GatewayResult<Self> {
        Ok(Self::new(token.query_param.clone())
            .with_request_headers(sanitize.request_headers.as_slice())?
            .with_response_headers(sanitize.response_headers.as_slice())?
            .with_query_params(sanitize.query_params.as_slice()))
    }

    /// Also strip these request headers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid header name.
    pub fn with_request_headers<S: AsRef<str>>(mut self, names: &[S]) -> GatewayResult<Self> {
        for name in names {
            self.request_headers.insert(header_name(name.as_ref())?);
        }
        Ok(self)
    }

    /// Also strip these response headers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid header name.
    pub fn with_response_headers<S: AsRef<str>>(mut self, names: &[S]) -> GatewayResult<Self> {
        for name in names {
            self.response_headers.insert(header_name(name.as_ref())?);
        }
        Ok(self)
    }

    /// Also strip these query parameters.
    #[must_use]
    pub fn with_query_params<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for name in names {
            let name = name.as_ref();
            if !self.query_params.iter().any(|n| n == name) {
                self.query_params.push(name.to_owned());
            }
        }
        self
    }

    /// Query parameters removed before forwarding.
    #[must_use]
    pub fn query_params(&self) -> &[String] {
        &self.query_params
    }

    /// Copy of `headers` without any header the client must not forward.
    #[must_use]
    pub fn clean_request_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let listed = connection_listed(headers);
        filter_headers(headers, |name, _| {
            self.request_headers.contains(name) || listed.contains(name)
        })
    }

    /// Copy of upstream `headers` without anything the client must not see.
    ///
    /// Any header whose value contains `credential` is dropped as well.
    #[must_use]
    pub fn clean_response_headers(&self, headers: &HeaderMap, credential: Option<&str>) -> HeaderMap {
        let listed = connection_listed(headers);
        let secret = credential.filter(|c| !c.is_empty()).map(str::as_bytes);
        filter_headers(headers, |name, value| {
            self.response_headers.contains(name)
                || listed.contains(name)
                || secret.is_some_and(|s| contains_subslice(value, s))
        })
    }

    /// [`clean_path_query_params`] with this rule set's parameter names.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedQuery`] if the query does not parse strictly.
    pub fn clean_path_query_params(&self, path: &str) -> Result<String, MalformedQuery> {
        clean_path_query_params(&self.query_params, path)
    }
}

fn header_name(raw: &str) -> GatewayResult<HeaderName> {
    HeaderName::from_bytes(raw.trim().to_ascii_lowercase().as_bytes())
        .map_err(|_| GatewayError::Config(format!("invalid header name '{raw}'")))
}

/// Header names listed in `Connection`, which are hop-by-hop for this message.
fn connection_listed(headers: &HeaderMap) -> HashSet<HeaderName> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| header_name(token).ok())
        .collect()
}

fn filter_headers(headers: &HeaderMap, discard: impl Fn(&HeaderName, &[u8]) -> bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !discard(name, value.as_bytes()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
