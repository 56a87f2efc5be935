//! `MAGICPROXY_*` environment variable overrides.
//!
//! Overrides are applied to the merged TOML tree before deserialization, so
//! they beat both the embedded defaults and the config file. Values are
//! converted to the field's TOML type here; range checks happen later in
//! validation.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};

/// Prefix shared by every override variable.
pub const ENV_PREFIX: &str = "MAGICPROXY_";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Str,
    Int,
    Bool,
    /// Comma-separated list of strings.
    List,
}

/// `(variable, dotted config path, kind)` for every supported override.
const OVERRIDES: &[(&str, &str, Kind)] = &[
    ("MAGICPROXY_SERVER_HOST", "server.host", Kind::Str),
    ("MAGICPROXY_SERVER_PORT", "server.port", Kind::Int),
    ("MAGICPROXY_SERVER_DEBUG", "server.debug", Kind::Bool),
    ("MAGICPROXY_SERVER_MAX_BODY_BYTES", "server.max_body_bytes", Kind::Int),
    ("MAGICPROXY_KEYS_CERTIFICATE_PATH", "keys.certificate_path", Kind::Str),
    ("MAGICPROXY_KEYS_PRIVATE_KEY_PATH", "keys.private_key_path", Kind::Str),
    ("MAGICPROXY_UPSTREAM_BASE_URL", "upstream.base_url", Kind::Str),
    ("MAGICPROXY_UPSTREAM_CREDENTIAL_ENV", "upstream.credential_env", Kind::Str),
    ("MAGICPROXY_UPSTREAM_AUTH_SCHEME", "upstream.auth_scheme", Kind::Str),
    ("MAGICPROXY_UPSTREAM_TIMEOUT_SECS", "upstream.timeout_secs", Kind::Int),
    ("MAGICPROXY_UPSTREAM_CONNECT_TIMEOUT_SECS", "upstream.connect_timeout_secs", Kind::Int),
    ("MAGICPROXY_UPSTREAM_USER_AGENT", "upstream.user_agent", Kind::Str),
    ("MAGICPROXY_TOKEN_QUERY_PARAM", "token.query_param", Kind::Str),
    ("MAGICPROXY_TOKEN_CLOCK_SKEW_SECS", "token.clock_skew_secs", Kind::Int),
    ("MAGICPROXY_TOKEN_MAX_TTL_SECS", "token.max_ttl_secs", Kind::Int),
    ("MAGICPROXY_SANITIZE_REQUEST_HEADERS", "sanitize.request_headers", Kind::List),
    ("MAGICPROXY_SANITIZE_RESPONSE_HEADERS", "sanitize.response_headers", Kind::List),
    ("MAGICPROXY_SANITIZE_QUERY_PARAMS", "sanitize.query_params", Kind::List),
    ("MAGICPROXY_LOG_LEVEL", "logging.level", Kind::Str),
    ("MAGICPROXY_LOG_FORMAT", "logging.format", Kind::Str),
];

/// Snapshot the process environment, keeping only `MAGICPROXY_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply every override present in `env` to `tree`.
///
/// Returns how many overrides were applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a value cannot be converted.
pub fn apply_env_overrides(
    tree: &mut toml::Value,
    env: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied: usize = 0;
    for (var, path, kind) in OVERRIDES {
        let Some(raw) = env.get(*var) else {
            continue;
        };
        let value = convert(var, raw, *kind)?;
        set_path(tree, path, value);
        applied = applied.saturating_add(1);
        tracing::debug!(var, field = path, "applied environment override");
    }
    Ok(applied)
}

fn convert(var: &str, raw: &str, kind: Kind) -> ConfigResult<toml::Value> {
    let err = |message: &str| ConfigError::EnvError {
        var: var.to_owned(),
        message: message.to_owned(),
    };
    let trimmed = raw.trim();
    match kind {
        Kind::Str => Ok(toml::Value::String(trimmed.to_owned())),
        Kind::Int => trimmed
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| err("expected an integer")),
        Kind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(err("expected a boolean")),
        },
        Kind::List => Ok(toml::Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_owned()))
                .collect(),
        )),
    }
}

/// Set a dotted path, creating intermediate tables as needed.
fn set_path(tree: &mut toml::Value, path: &str, value: toml::Value) {
    let mut node = tree;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if !node.is_table() {
            *node = toml::Value::Table(toml::map::Map::new());
        }
        let toml::Value::Table(table) = node else {
            return;
        };
        if parts.peek().is_none() {
            table.insert(part.to_owned(), value);
            return;
        }
        node = table
            .entry(part.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}
