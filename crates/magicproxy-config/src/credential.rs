//! The upstream credential, read from the environment at startup.

use zeroize::Zeroizing;

use crate::error::{ConfigError, ConfigResult};

/// Secret used to authenticate to the upstream API.
///
/// Zeroized on drop. `Debug` never shows the value.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Wrap a credential value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Read the credential from environment variable `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if the variable is unset,
    /// not valid UTF-8, or blank.
    pub fn from_env(var: &str) -> ConfigResult<Self> {
        match std::env::var(var) {
            Ok(v) if !v.trim().is_empty() => Ok(Self::new(v.trim())),
            _ => Err(ConfigError::MissingCredential {
                var: var.to_owned(),
            }),
        }
    }

    /// The secret value. Keep the borrow short.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}
