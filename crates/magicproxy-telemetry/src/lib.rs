//! magicproxy Telemetry - Logging and request tracing.
//!
//! This crate provides:
//! - Stderr logging in pretty, compact, JSON or full format
//! - A per-request context whose span carries the request id
//!
//! # Example
//!
//! ```rust,no_run
//! use magicproxy_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//! use tracing::Instrument;
//!
//! # async fn run() -> Result<(), magicproxy_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("hyper=warn");
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("GET", "/repos/octocat/Hello-World?key=secret");
//! async { tracing::info!("forwarding") }
//!     .instrument(ctx.span())
//!     .await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_logging};
