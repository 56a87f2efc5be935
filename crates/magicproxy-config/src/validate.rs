//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Largest accepted request body limit (1 GiB).
const MAX_BODY_UPPER_BOUND: usize = 1_073_741_824;

/// Longest accepted upstream timeout (10 minutes).
const MAX_TIMEOUT_SECS: u64 = 600;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_server(config)?;
    validate_keys(config)?;
    validate_upstream(config)?;
    validate_token(config)?;
    validate_sanitize(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let s = &config.server;
    if s.host.trim().is_empty() {
        return Err(invalid("server.host", "host must not be empty"));
    }
    if s.max_body_bytes == 0 || s.max_body_bytes > MAX_BODY_UPPER_BOUND {
        return Err(invalid(
            "server.max_body_bytes",
            format!("max_body_bytes must be between 1 and {MAX_BODY_UPPER_BOUND}"),
        ));
    }
    Ok(())
}

fn validate_keys(config: &Config) -> ConfigResult<()> {
    if config.keys.certificate_path.trim().is_empty() {
        return Err(invalid("keys.certificate_path", "certificate path must not be empty"));
    }
    if config
        .keys
        .private_key_path
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(invalid(
            "keys.private_key_path",
            "private key path must not be empty when set",
        ));
    }
    Ok(())
}

fn validate_upstream(config: &Config) -> ConfigResult<()> {
    let u = &config.upstream;

    let Some((scheme, rest)) = u.base_url.split_once("://") else {
        return Err(invalid("upstream.base_url", "base_url must be an absolute URL"));
    };
    if !matches!(scheme, "http" | "https") || rest.is_empty() {
        return Err(invalid(
            "upstream.base_url",
            format!("unsupported base_url '{}'; expected http(s)://host", u.base_url),
        ));
    }
    if rest.contains('?') || rest.contains('#') {
        return Err(invalid(
            "upstream.base_url",
            "base_url must not carry a query or fragment",
        ));
    }

    if u.credential_env.is_empty()
        || !u
            .credential_env
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid(
            "upstream.credential_env",
            "credential_env must be a non-empty environment variable name",
        ));
    }

    if u.auth_scheme.is_empty() || !u.auth_scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(
            "upstream.auth_scheme",
            "auth_scheme must be a single alphanumeric word",
        ));
    }

    for (field, secs) in [
        ("upstream.timeout_secs", u.timeout_secs),
        ("upstream.connect_timeout_secs", u.connect_timeout_secs),
    ] {
        if secs == 0 || secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                field,
                format!("timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
            ));
        }
    }
    if u.connect_timeout_secs > u.timeout_secs {
        return Err(invalid(
            "upstream.connect_timeout_secs",
            "connect timeout must not exceed the request timeout",
        ));
    }
    Ok(())
}

fn validate_token(config: &Config) -> ConfigResult<()> {
    let t = &config.token;
    if t.query_param.is_empty()
        || !t
            .query_param
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(invalid(
            "token.query_param",
            "query_param must be a non-empty name of [A-Za-z0-9_.-]",
        ));
    }
    if t.max_ttl_secs == 0 {
        return Err(invalid("token.max_ttl_secs", "max_ttl_secs must be positive"));
    }
    if t.clock_skew_secs >= t.max_ttl_secs {
        return Err(invalid(
            "token.clock_skew_secs",
            "clock skew must be smaller than the maximum token lifetime",
        ));
    }
    Ok(())
}

fn validate_sanitize(config: &Config) -> ConfigResult<()> {
    let s = &config.sanitize;
    for (field, names) in [
        ("sanitize.request_headers", &s.request_headers),
        ("sanitize.response_headers", &s.response_headers),
    ] {
        if let Some(bad) = names.iter().find(|n| !is_header_name(n)) {
            return Err(invalid(field, format!("'{bad}' is not a valid header name")));
        }
    }
    if s.query_params.iter().any(String::is_empty) {
        return Err(invalid(
            "sanitize.query_params",
            "query parameter names must not be empty",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(
        l.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}

/// RFC 9110 token characters.
fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}
