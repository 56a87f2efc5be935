//! magicproxy Token - signed, self-contained capability tokens.
//!
//! This crate provides:
//! - [`ScopePattern`]: a fixed-depth path template plus an allowed verb set
//! - Depth-exact path matching for scope checks
//! - [`MagicToken`]: issue, encode, parse, and verify
//!
//! # Security Model
//!
//! A magic token is the only thing a client holds. It is:
//! - Signed with the proxy's ed25519 key over a canonical byte encoding
//! - Time-bounded (`issued_at < expires_at`, checked on every request)
//! - Scoped to exactly one pattern; broader access needs a new token
//!
//! No server-side lookup is involved, so any proxy instance holding the
//! certificate can verify any token.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use magicproxy_crypto::KeyMaterial;
//! use magicproxy_token::{MagicToken, ScopePattern, Verb, VerbSet};
//!
//! let keys = KeyMaterial::generate().unwrap();
//! let scope = ScopePattern::new("/*/*", VerbSet::from_verbs([Verb::Get])).unwrap();
//!
//! let token = MagicToken::issue(scope, Duration::hours(1), &keys).unwrap();
//! let wire = token.encode();
//!
//! let parsed = MagicToken::parse(&wire).unwrap();
//! parsed.verify(&keys, Utc::now(), Duration::zero()).unwrap();
//! assert!(parsed.grants("/octocat/Hello-World", Verb::Get));
//! assert!(!parsed.grants("/octocat/Hello-World", Verb::Post));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod pattern;
mod token;
mod verb;

pub use error::{TokenError, TokenResult};
pub use pattern::{MAX_DEPTH, ScopePattern, Segment, split_path};
pub use token::{MAX_TOKEN_LEN, MagicToken};
pub use verb::{Verb, VerbSet};
