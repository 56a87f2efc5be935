//! Per-request context for correlation and tracing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for one proxied request.
///
/// The recorded path never includes the query string, so tokens passed as
/// query parameters cannot reach the logs through the span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// HTTP method.
    pub method: String,
    /// Request path without query or fragment.
    pub path: String,
    /// When the request started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a context for a new request. Any query string in `path_and_query`
    /// is dropped.
    #[must_use]
    pub fn new(method: impl Into<String>, path_and_query: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            method: method.into(),
            path: strip_query(path_and_query).to_owned(),
            started_at: Utc::now(),
        }
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Create a tracing span with this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
        )
    }
}

fn strip_query(path_and_query: &str) -> &str {
    path_and_query
        .split(['?', '#'])
        .next()
        .unwrap_or(path_and_query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_creation() {
        let ctx = RequestContext::new("GET", "/repos/octocat/Hello-World");
        assert_eq!(ctx.method, "GET");
        assert_eq!(ctx.path, "/repos/octocat/Hello-World");
        assert_ne!(ctx.request_id, RequestContext::new("GET", "/").request_id);
    }

    #[test]
    fn test_query_never_recorded() {
        let ctx = RequestContext::new("GET", "/user?key=abc.def.ghi&page=2");
        assert_eq!(ctx.path, "/user");

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("abc.def.ghi"));
    }

    #[test]
    fn test_elapsed() {
        let ctx = RequestContext::new("GET", "/");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }
}
