//! The per-request pipeline.
//!
//! Every request moves through [`Stage`]s in order. A failure before
//! [`Stage::Forwarded`] rejects the request without contacting upstream.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use magicproxy_telemetry::RequestContext;
use magicproxy_token::{MagicToken, Verb};
use serde_json::json;
use tracing::Instrument;

use crate::context::AppContext;
use crate::error::ProxyError;
use crate::forward::ProxyRequest;
use crate::sanitize::{has_dot_segment, parse_query};

/// Header accepted as an alternative to the query parameter.
pub const MAGIC_TOKEN_HEADER: &str = "x-magic-token";

/// Pipeline position of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Accepted by the listener.
    Received,
    /// Token text located.
    TokenExtracted,
    /// Signature and validity interval checked.
    TokenVerified,
    /// Path and verb covered by the token's scope.
    ScopeChecked,
    /// Headers, query and body prepared for upstream.
    Sanitized,
    /// Upstream answered.
    Forwarded,
    /// Reply sent to the client.
    Responded,
}

impl Stage {
    /// Lowercase name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::TokenExtracted => "token_extracted",
            Self::TokenVerified => "token_verified",
            Self::ScopeChecked => "scope_checked",
            Self::Sanitized => "sanitized",
            Self::Forwarded => "forwarded",
            Self::Responded => "responded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejection and the last stage the request completed.
type Rejection = (Stage, ProxyError);

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, Rejection>;
}

impl<T, E: Into<ProxyError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, Rejection> {
        self.map_err(|e| (stage, e.into()))
    }
}

/// `GET /__health`. Answered locally.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Fallback handler: authorize, sanitize and forward any other request.
pub async fn proxy(State(ctx): State<Arc<AppContext>>, request: Request) -> Response {
    let rctx = RequestContext::new(request.method().as_str(), request.uri().path());
    let span = rctx.span();

    async move {
        match run_pipeline(&ctx, request).await {
            Ok(response) => {
                tracing::info!(
                    stage = %Stage::Responded,
                    status = response.status().as_u16(),
                    elapsed_ms = rctx.elapsed_ms(),
                    "request proxied"
                );
                response
            },
            Err((stage, err)) => {
                let status = err.status();
                if matches!(err, ProxyError::Upstream(_)) {
                    tracing::warn!(
                        stage = %stage,
                        kind = err.kind(),
                        error = %err,
                        "upstream call failed"
                    );
                } else {
                    tracing::info!(
                        stage = %stage,
                        kind = err.kind(),
                        status = status.as_u16(),
                        "request rejected"
                    );
                }
                err.into_response()
            },
        }
    }
    .instrument(span)
    .await
}

async fn run_pipeline(ctx: &AppContext, request: Request) -> Result<Response, Rejection> {
    let (parts, body) = request.into_parts();

    let verb: Verb = parts
        .method
        .as_str()
        .parse()
        .map_err(|_| ProxyError::MethodNotAllowed(parts.method.to_string()))
        .at(Stage::Received)?;

    if has_dot_segment(parts.uri.path()) {
        return Err((Stage::Received, ProxyError::DotSegment));
    }

    let text = extract_token(ctx.token_param(), parts.uri.query(), &parts.headers)
        .at(Stage::Received)?;

    let token = MagicToken::parse(&text).at(Stage::TokenExtracted)?;
    token
        .verify(ctx.keys(), Utc::now(), ctx.clock_skew())
        .at(Stage::TokenExtracted)?;

    if !token.grants(parts.uri.path(), verb) {
        return Err((
            Stage::TokenVerified,
            ProxyError::ScopeMismatch {
                method: parts.method.to_string(),
            },
        ));
    }
    tracing::debug!(scope = %token.scope(), "token accepted");

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let path_and_query = ctx
        .rules()
        .clean_path_query_params(path_and_query)
        .at(Stage::ScopeChecked)?;
    let headers = ctx.rules().clean_request_headers(&parts.headers);
    let body = read_body(&parts.headers, body, ctx.max_body_bytes())
        .await
        .at(Stage::ScopeChecked)?;

    let upstream = ctx
        .forwarder()
        .forward(ProxyRequest {
            method: parts.method,
            path_and_query,
            headers,
            body,
        })
        .await
        .at(Stage::Sanitized)?;

    let mut headers = ctx.rules().clean_response_headers(
        &upstream.headers,
        Some(ctx.forwarder().credential().expose()),
    );
    // A HEAD reply has no body to recompute framing from.
    if let (Verb::Head, Some(length)) = (verb, upstream.headers.get(CONTENT_LENGTH)) {
        headers.insert(CONTENT_LENGTH, length.clone());
    }
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Locate the token text.
///
/// The query parameter wins; without it, `Authorization: Bearer|token <t>` and
/// then `X-Magic-Token` are consulted.
fn extract_token<'a>(
    param: &str,
    query: Option<&'a str>,
    headers: &'a HeaderMap,
) -> Result<Cow<'a, str>, ProxyError> {
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let mut found = parse_query(query)?
            .into_iter()
            .filter(|field| field.name == param);
        match (found.next(), found.next()) {
            (Some(field), None) => return Ok(field.value),
            (Some(_), Some(_)) => return Err(ProxyError::DuplicateToken),
            (None, _) => {},
        }
    }

    let from_authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| {
            scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token")
        })
        .map(|(_, value)| value.trim());
    let from_header = || {
        headers
            .get(MAGIC_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    from_authorization
        .or_else(from_header)
        .filter(|t| !t.is_empty())
        .map(Cow::Borrowed)
        .ok_or(ProxyError::MissingToken)
}

async fn read_body(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<axum::body::Bytes, ProxyError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > u64::try_from(limit).unwrap_or(u64::MAX)) {
        return Err(ProxyError::PayloadTooLarge { limit });
    }
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ProxyError::PayloadTooLarge { limit })
}
