//! Configuration types for the magicproxy process.
//!
//! Every struct implements [`Default`] matching `defaults.toml`, so a bare
//! `[section]` header in TOML produces a working configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Layered as embedded defaults, then an optional TOML file, then
/// `MAGICPROXY_*` environment variables. CLI flags are applied by the binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listener settings.
    pub server: ServerSection,
    /// Key material file locations.
    pub keys: KeysSection,
    /// Upstream API and credential lookup.
    pub upstream: UpstreamSection,
    /// Token extraction and validity policy.
    pub token: TokenSection,
    /// Extra names for the header and query sanitizer.
    pub sanitize: SanitizeSection,
    /// Log filtering and output format.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Debug mode: raises the default log level to `debug`.
    pub debug: bool,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            debug: false,
            max_body_bytes: 10_485_760,
        }
    }
}

impl ServerSection {
    /// `host:port`, ready for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

// ---------------------------------------------------------------------------
// KeysSection
// ---------------------------------------------------------------------------

/// Paths to the decrypted key material supplied by the provisioning side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysSection {
    /// PEM certificate holding the verification key.
    pub certificate_path: String,
    /// PEM private key. Only needed where tokens are issued.
    pub private_key_path: Option<String>,
}

impl Default for KeysSection {
    fn default() -> Self {
        Self {
            certificate_path: "/etc/magicproxy/proxy.crt".to_owned(),
            private_key_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UpstreamSection
// ---------------------------------------------------------------------------

/// Where requests are forwarded and how they authenticate.
///
/// The credential itself never appears in config; only the name of the
/// environment variable holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Base URL of the upstream API.
    pub base_url: String,
    /// Environment variable holding the upstream credential.
    pub credential_env: String,
    /// Scheme in `Authorization: <scheme> <credential>`.
    pub auth_scheme: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
    /// `User-Agent` sent when the client supplies none. `None` uses
    /// `magicproxy/<version>`.
    pub user_agent: Option<String>,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_owned(),
            credential_env: "GITHUB_TOKEN".to_owned(),
            auth_scheme: "token".to_owned(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TokenSection
// ---------------------------------------------------------------------------

/// Token extraction and validity policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    /// Query parameter carrying the token. Always stripped before forwarding.
    pub query_param: String,
    /// Tolerance applied to both ends of the validity interval, in seconds.
    pub clock_skew_secs: u64,
    /// Longest lifetime `issue` will sign, in seconds.
    pub max_ttl_secs: u64,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            query_param: "key".to_owned(),
            clock_skew_secs: 0,
            max_ttl_secs: 2_592_000,
        }
    }
}

// ---------------------------------------------------------------------------
// SanitizeSection
// ---------------------------------------------------------------------------

/// Names added to the built-in sanitizer rules. Matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeSection {
    /// Extra request headers to drop before forwarding.
    pub request_headers: Vec<String>,
    /// Extra response headers to drop before replying.
    pub response_headers: Vec<String>,
    /// Extra query parameters to strip (the token parameter always is).
    pub query_params: Vec<String>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["hyper=warn"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}

impl LoggingSection {
    /// The level actually used, taking `server.debug` into account.
    #[must_use]
    pub fn effective_level(&self, debug: bool) -> &str {
        if debug && matches!(self.level.as_str(), "info" | "warn" | "error") {
            "debug"
        } else {
            &self.level
        }
    }
}
