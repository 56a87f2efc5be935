#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the magicproxy process.
//!
//! # Usage
//!
//! ```rust,no_run
//! use magicproxy_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("magicproxy.toml"))).unwrap();
//! println!("listening on {}", config.server.bind_addr());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **CLI flags** (applied by the binary)
//! 2. **Environment variables** (`MAGICPROXY_*`)
//! 3. **Config file** (`--config`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! The upstream credential is never stored in config. Only the name of the
//! variable holding it is, and [`Credential`] reads it at startup.

/// Upstream credential handling.
pub mod credential;
/// `MAGICPROXY_*` environment overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading and layering.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use credential::Credential;
pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Load configuration from a single file over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Re-run validation, e.g. after CLI flags were applied.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::ValidationError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
