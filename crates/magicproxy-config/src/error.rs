//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file (or the merged tree) is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// File or layer that failed.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// An environment override could not be converted to the field's type.
    #[error("invalid value for {var}: {message}")]
    EnvError {
        /// Environment variable name.
        var: String,
        /// What was wrong.
        message: String,
    },

    /// A field holds a value outside its accepted range.
    #[error("invalid config value for {field}: {message}")]
    ValidationError {
        /// Dotted field path, e.g. `server.port`.
        field: String,
        /// What was wrong.
        message: String,
    },

    /// The upstream credential variable is unset or empty.
    #[error("upstream credential variable {var} is not set")]
    MissingCredential {
        /// Environment variable that should hold the credential.
        var: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
