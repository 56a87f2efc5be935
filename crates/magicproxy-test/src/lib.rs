//! magicproxy Test - Shared test utilities.
//!
//! Fixtures for key material, scope patterns, and tokens, used across the
//! workspace as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! magicproxy-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use magicproxy_test::{test_key_material, issue_token};
//!
//! let keys = test_key_material();
//! let token = issue_token(&keys, "GET /*/*");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
