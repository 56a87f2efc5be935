//! Prelude module - commonly used test helpers.
//!
//! Use `use magicproxy_test::prelude::*;` in test modules.

pub use crate::fixtures::{
    expired_token, issue_token, issue_token_at, test_key_material, test_scope,
};
pub use crate::harness::{KeyFiles, init_test_logging};
