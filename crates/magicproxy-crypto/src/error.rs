//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur while loading or using key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid signature length.
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,

    /// A PEM block was missing, mislabelled, or badly framed.
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// A certificate body could not be decoded or its self-signature is bad.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The private key does not belong to the certificate.
    #[error("private key does not match certificate public key")]
    KeyMismatch,

    /// Signing was requested but no private key is loaded.
    #[error("no private key loaded; key material is verification-only")]
    NoPrivateKey,

    /// I/O error (e.g. reading key files).
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
