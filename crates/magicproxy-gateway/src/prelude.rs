//! Prelude module - commonly used types for convenient import.
//!
//! Use `use magicproxy_gateway::prelude::*;` to import all essential types.

// Errors
pub use crate::{GatewayError, GatewayResult, ProxyError};

// State and forwarding
pub use crate::{AppContext, Forwarder, SanitizationRuleSet};

// Serving
pub use crate::{router, run, serve};
