//! Ed25519 signatures.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use std::fmt;

use crate::error::{CryptoError, CryptoResult};

/// Length of an ed25519 signature.
pub(crate) const SIGNATURE_LEN: usize = 64;

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSignatureLength`] if the slice is not exactly 64 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; SIGNATURE_LEN] =
            slice
                .try_into()
                .map_err(|_| CryptoError::InvalidSignatureLength {
                    expected: SIGNATURE_LEN,
                    actual: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Encode as unpadded URL-safe base64 (the token wire alphabet).
    #[must_use]
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Decode from unpadded URL-safe base64.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid base64url or not 64 bytes.
    pub fn from_base64url(s: &str) -> CryptoResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| CryptoError::InvalidBase64Encoding)?;
        Self::try_from_slice(&bytes)
    }

    /// Verify this signature against a message and raw public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the public key is invalid or signature verification fails.
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> CryptoResult<()> {
        let verifying_key = VerifyingKey::from_bytes(public_key)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

        // verify_strict rejects small-order keys and non-canonical R/S encodings,
        // so a given message has exactly one accepted signature per key.
        verifying_key
            .verify_strict(message, &DalekSignature::from_bytes(&self.0))
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..8]))
    }
}

impl From<DalekSignature> for Signature {
    fn from(sig: DalekSignature) -> Self {
        Self(sig.to_bytes())
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_signature_base64url() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign(b"test message");

        let encoded = sig.to_base64url();
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(Signature::from_base64url(&encoded).unwrap(), sig);
    }

    #[test]
    fn test_signature_verification() {
        let keypair = KeyPair::generate();
        let message = b"test message";
        let sig = keypair.sign(message);

        assert!(sig.verify(message, keypair.public_key_bytes()).is_ok());
        assert!(
            sig.verify(b"wrong message", keypair.public_key_bytes())
                .is_err()
        );

        let other = KeyPair::generate();
        assert!(sig.verify(message, other.public_key_bytes()).is_err());
    }

    #[test]
    fn test_zero_signature_rejected() {
        let keypair = KeyPair::generate();
        let zero = Signature::from_bytes([0u8; SIGNATURE_LEN]);
        assert!(zero.verify(b"anything", keypair.public_key_bytes()).is_err());
    }

    #[test]
    fn test_invalid_signature_length() {
        let result = Signature::try_from_slice(&[0u8; 63]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidSignatureLength { .. })
        ));
    }
}
