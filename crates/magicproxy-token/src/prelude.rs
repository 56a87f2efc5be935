//! Prelude module - commonly used types for convenient import.
//!
//! Use `use magicproxy_token::prelude::*;` to import all essential types.

// Errors
pub use crate::{TokenError, TokenResult};

// Scope
pub use crate::{ScopePattern, Segment, Verb, VerbSet};

// Token
pub use crate::MagicToken;
