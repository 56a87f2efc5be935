//! Gateway error types.
//!
//! [`GatewayError`] covers startup and serving. [`ProxyError`] is the reason a
//! single request was rejected; it renders as a JSON error response and never
//! carries token text or credential material.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use magicproxy_token::TokenError;
use serde::Serialize;
use thiserror::Error;

use crate::forward::ForwardError;
use crate::sanitize::MalformedQuery;

/// Errors building or running the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration could not be turned into a working gateway.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),

    /// The listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Why a request was not (successfully) proxied.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No token in the query string or headers.
    #[error("no magic token supplied")]
    MissingToken,

    /// The token parameter appears more than once.
    #[error("token parameter repeated")]
    DuplicateToken,

    /// Token parsing or verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The token is valid but does not cover this path and verb.
    #[error("token scope does not permit {method} on this path")]
    ScopeMismatch {
        /// Request method.
        method: String,
    },

    /// The path has a `.` or `..` segment, plain or percent-encoded.
    #[error("path contains a dot segment")]
    DotSegment,

    /// The query string cannot be parsed strictly.
    #[error(transparent)]
    MalformedQuery(#[from] MalformedQuery),

    /// The method is not one a scope can grant.
    #[error("method {0} is not supported")]
    MethodNotAllowed(String),

    /// The request body exceeds the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The upstream call failed.
    #[error(transparent)]
    Upstream(#[from] ForwardError),
}

impl ProxyError {
    /// HTTP status for this rejection.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::DuplicateToken | Self::DotSegment | Self::MalformedQuery(_) => {
                StatusCode::BAD_REQUEST
            },
            Self::Token(e) => match e {
                TokenError::Malformed(_)
                | TokenError::InvalidInterval { .. }
                | TokenError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
                TokenError::InvalidSignature
                | TokenError::Expired { .. }
                | TokenError::NotYetValid { .. } => StatusCode::UNAUTHORIZED,
                TokenError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::ScopeMismatch { .. } => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(e) => e.status(),
        }
    }

    /// Short, stable identifier used in logs and the `error` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::DuplicateToken => "malformed_token",
            Self::Token(e) => e.kind(),
            Self::ScopeMismatch { .. } => "scope_mismatch",
            Self::DotSegment => "invalid_path",
            Self::MalformedQuery(_) => "malformed_query",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Upstream(e) => e.kind(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error kind.
    pub error: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_map_to_spec_statuses() {
        let cases = [
            (TokenError::Malformed("x".into()), StatusCode::BAD_REQUEST),
            (
                TokenError::InvalidInterval {
                    issued_at: 2,
                    expires_at: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (TokenError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (TokenError::Expired { expires_at: 1 }, StatusCode::UNAUTHORIZED),
            (TokenError::NotYetValid { issued_at: 1 }, StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(ProxyError::Token(err).status(), status);
        }
    }

    #[test]
    fn test_request_errors_map_to_statuses() {
        assert_eq!(ProxyError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ProxyError::DuplicateToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::DotSegment.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::DotSegment.kind(), "invalid_path");
        assert_eq!(
            ProxyError::ScopeMismatch {
                method: "POST".into()
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ProxyError::MalformedQuery(MalformedQuery).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::PayloadTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ProxyError::MethodNotAllowed("TRACE".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_upstream_errors_map_to_gateway_statuses() {
        let unavailable = ForwardError::Unavailable {
            reason: "connection refused".into(),
            timed_out: false,
        };
        assert_eq!(ProxyError::from(unavailable).status(), StatusCode::BAD_GATEWAY);

        let timeout = ForwardError::Unavailable {
            reason: "timed out".into(),
            timed_out: true,
        };
        assert_eq!(ProxyError::from(timeout).status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let resp = ProxyError::Token(TokenError::Expired { expires_at: 10 }).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "expired_token");
        assert!(body["message"].as_str().unwrap().contains("expired"));
    }
}
