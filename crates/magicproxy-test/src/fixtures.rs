//! Test fixtures for keys, scopes, and tokens.

use chrono::{DateTime, Duration, Utc};
use magicproxy_crypto::KeyMaterial;
use magicproxy_token::{MagicToken, ScopePattern};

/// Fresh key material that can sign.
///
/// # Panics
///
/// Panics if the generated public key cannot be PEM-encoded.
#[must_use]
pub fn test_key_material() -> KeyMaterial {
    KeyMaterial::generate().expect("generate test key material")
}

/// Parse a scope in canonical text form, e.g. `GET,HEAD /repos/*/*`.
///
/// # Panics
///
/// Panics if `scope` is not a valid pattern.
#[must_use]
pub fn test_scope(scope: &str) -> ScopePattern {
    scope.parse().expect("valid test scope")
}

/// Issue a one-hour token for `scope` and return its wire form.
///
/// # Panics
///
/// Panics if `scope` is invalid or `keys` cannot sign.
#[must_use]
pub fn issue_token(keys: &KeyMaterial, scope: &str) -> String {
    MagicToken::issue(test_scope(scope), Duration::hours(1), keys)
        .expect("issue test token")
        .encode()
}

/// Issue a token with an explicit start time and lifetime.
///
/// # Panics
///
/// Panics if `scope` is invalid, `ttl` is under a second, or `keys` cannot sign.
#[must_use]
pub fn issue_token_at(
    keys: &KeyMaterial,
    scope: &str,
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> String {
    MagicToken::issue_at(test_scope(scope), issued_at, ttl, keys)
        .expect("issue test token")
        .encode()
}

/// A token whose validity ended an hour ago.
///
/// # Panics
///
/// Same as [`issue_token_at`].
#[must_use]
pub fn expired_token(keys: &KeyMaterial, scope: &str) -> String {
    let issued_at = Utc::now()
        .checked_sub_signed(Duration::hours(2))
        .expect("time in range");
    issue_token_at(keys, scope, issued_at, Duration::hours(1))
}
