//! Token error types.

use thiserror::Error;

/// Errors from building, parsing, or verifying magic tokens.
///
/// Messages never include token text or signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token text is structurally invalid.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// A scope pattern or verb list failed to parse or validate.
    #[error("invalid scope pattern: {0}")]
    InvalidPattern(String),

    /// `issued_at` is not strictly before `expires_at`.
    #[error("invalid validity interval: issued at {issued_at}, expires at {expires_at}")]
    InvalidInterval {
        /// Issue time (Unix seconds).
        issued_at: i64,
        /// Expiry time (Unix seconds).
        expires_at: i64,
    },

    /// The signature does not verify against the proxy's public key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token's validity interval has ended.
    #[error("token expired at {expires_at}")]
    Expired {
        /// Expiry time (Unix seconds).
        expires_at: i64,
    },

    /// The token's validity interval has not started yet.
    #[error("token not valid before {issued_at}")]
    NotYetValid {
        /// Issue time (Unix seconds).
        issued_at: i64,
    },

    /// The token could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Short, stable identifier for logs and error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_token",
            Self::InvalidPattern(_) => "invalid_pattern",
            Self::InvalidInterval { .. } => "invalid_interval",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired { .. } => "expired_token",
            Self::NotYetValid { .. } => "token_not_yet_valid",
            Self::Signing(_) => "signing_error",
        }
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
