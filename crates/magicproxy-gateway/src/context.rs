//! Shared, read-only state for request handlers.

use chrono::Duration;
use magicproxy_config::{Config, Credential};
use magicproxy_crypto::KeyMaterial;

use crate::error::{GatewayError, GatewayResult};
use crate::forward::Forwarder;
use crate::sanitize::SanitizationRuleSet;

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10_485_760;

/// Everything a request needs, built once at startup.
///
/// Immutable after construction; shared between handlers behind an `Arc`.
#[derive(Debug)]
pub struct AppContext {
    keys: KeyMaterial,
    rules: SanitizationRuleSet,
    forwarder: Forwarder,
    token_param: String,
    clock_skew: Duration,
    max_body_bytes: usize,
}

impl AppContext {
    /// Context with built-in sanitizer rules, no clock skew and the default
    /// body limit.
    #[must_use]
    pub fn new(keys: KeyMaterial, forwarder: Forwarder, token_param: impl Into<String>) -> Self {
        let token_param = token_param.into();
        Self {
            keys: keys.into_verification_only(),
            rules: SanitizationRuleSet::new(token_param.clone()),
            forwarder,
            token_param,
            clock_skew: Duration::zero(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Build from a validated config, loaded keys and the upstream credential.
    ///
    /// Only the verification half of `keys` is kept.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the sanitizer extras or upstream
    /// settings are unusable.
    pub fn from_config(
        config: &Config,
        keys: KeyMaterial,
        credential: Credential,
    ) -> GatewayResult<Self> {
        let forwarder = Forwarder::from_config(&config.upstream, credential)?;
        let rules = SanitizationRuleSet::from_config(&config.token, &config.sanitize)?;
        let skew_secs = i64::try_from(config.token.clock_skew_secs).map_err(|_| {
            GatewayError::Config("token.clock_skew_secs is out of range".to_owned())
        })?;

        Ok(Self::new(keys, forwarder, config.token.query_param.clone())
            .with_rules(rules)
            .with_clock_skew(Duration::seconds(skew_secs))
            .with_max_body_bytes(config.server.max_body_bytes))
    }

    /// Replace the sanitizer rules.
    #[must_use]
    pub fn with_rules(mut self, rules: SanitizationRuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Tolerance applied to both ends of a token's validity interval.
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Largest accepted request body.
    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Verification key material.
    #[must_use]
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Sanitizer rules.
    #[must_use]
    pub fn rules(&self) -> &SanitizationRuleSet {
        &self.rules
    }

    /// Upstream forwarder.
    #[must_use]
    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Query parameter carrying the token.
    #[must_use]
    pub fn token_param(&self) -> &str {
        &self.token_param
    }

    /// Configured clock skew.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}
