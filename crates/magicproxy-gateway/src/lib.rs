//! magicproxy Gateway - the capability-scoped reverse proxy.
//!
//! This crate provides:
//! - Token extraction, verification and scope checks per request
//! - Header and query sanitization in both directions
//! - Forwarding with the proxy's own upstream credential
//! - The axum router, serve loop and graceful shutdown
//!
//! # Request flow
//!
//! ```text
//! client ──► extract token ──► verify ──► scope check ──► sanitize ──► upstream
//!   ▲                                                                      │
//!   └──────────────── sanitize response headers ◄──────────────────────────┘
//! ```
//!
//! Any rejection before forwarding is answered locally with a JSON error
//! body; the upstream never sees the request.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use magicproxy_gateway::{AppContext, run};
//!
//! let ctx = AppContext::from_config(&config, keys, credential)?;
//! run(&config.server.bind_addr(), Arc::new(ctx)).await?;
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod context;
pub mod error;
pub mod forward;
pub mod handler;
pub mod sanitize;
pub mod server;

pub use context::{AppContext, DEFAULT_MAX_BODY_BYTES};
pub use error::{ErrorBody, GatewayError, GatewayResult, ProxyError};
pub use forward::{ForwardError, Forwarder, ProxyRequest, ProxyResponse};
pub use handler::{MAGIC_TOKEN_HEADER, Stage};
pub use sanitize::{MalformedQuery, SanitizationRuleSet, clean_path_query_params};
pub use server::{HEALTH_PATH, router, run, serve, shutdown_signal};
