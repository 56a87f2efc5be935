//! The proxy's immutable key material.
//!
//! Loaded once at startup from decrypted PEM bytes handed over by the
//! provisioning side (a PKCS#8 private key and an X.509 certificate, as
//! OpenSSL writes them), then shared read-only (`Arc<KeyMaterial>`) by every
//! request. Nothing here is ever mutated after construction.

use std::path::Path;

use zeroize::Zeroizing;

use crate::certificate::Certificate;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::ContentHash;
use crate::keypair::{KeyPair, PublicKey};
use crate::signature::Signature;

/// Signing key (optional) and the certificate tokens verify against.
///
/// Invariant: when a private key is present, its public key is the one the
/// certificate carries.
pub struct KeyMaterial {
    signer: Option<KeyPair>,
    certificate: Certificate,
}

impl KeyMaterial {
    /// Generate a fresh key pair. The certificate half is a bare
    /// `PUBLIC KEY` block.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the public key cannot be encoded.
    pub fn generate() -> CryptoResult<Self> {
        let keypair = KeyPair::generate();
        let certificate = Certificate::for_keypair(&keypair)?;
        Self::from_parts(Some(keypair), certificate)
    }

    /// Assemble material from already-parsed parts.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyMismatch`] if `signer` does not belong to `certificate`.
    pub fn from_parts(signer: Option<KeyPair>, certificate: Certificate) -> CryptoResult<Self> {
        if let Some(kp) = &signer {
            if &kp.export_public_key() != certificate.public_key() {
                return Err(CryptoError::KeyMismatch);
            }
        }
        Ok(Self {
            signer,
            certificate,
        })
    }

    /// Parse PEM text for the (optional) PKCS#8 private key and the
    /// certificate (X.509 or bare public key).
    ///
    /// # Errors
    ///
    /// Returns a PEM/certificate error if either input is malformed, or
    /// [`CryptoError::KeyMismatch`] if the private key is not the certificate's.
    pub fn from_pem(private_key_pem: Option<&[u8]>, certificate_pem: &[u8]) -> CryptoResult<Self> {
        let certificate = Certificate::from_pem(certificate_pem)?;
        let signer = private_key_pem.map(KeyPair::from_pem).transpose()?;
        Self::from_parts(signer, certificate)
    }

    /// Read and parse key files.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] if a file cannot be read, otherwise
    /// the same errors as [`from_pem`](Self::from_pem).
    pub fn from_files(private_key_path: Option<&Path>, certificate_path: &Path) -> CryptoResult<Self> {
        let certificate = read_file(certificate_path)?;
        let private_key = private_key_path.map(read_file).transpose()?;
        Self::from_pem(
            private_key.as_ref().map(|b| b.as_slice()),
            certificate.as_slice(),
        )
    }

    /// The public key tokens are verified against.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        self.certificate.public_key()
    }

    /// The loaded certificate.
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The certificate as PEM text.
    #[must_use]
    pub fn certificate_pem(&self) -> &str {
        self.certificate.pem()
    }

    /// The private key as PKCS#8 PEM text.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NoPrivateKey`] for verification-only material.
    pub fn private_key_pem(&self) -> CryptoResult<Zeroizing<String>> {
        self.signer
            .as_ref()
            .ok_or(CryptoError::NoPrivateKey)?
            .to_pem()
    }

    /// Certificate fingerprint, safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        self.certificate.fingerprint()
    }

    /// Whether this material can issue tokens.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    /// Sign `message` with the private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NoPrivateKey`] for verification-only material.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        self.signer
            .as_ref()
            .map(|kp| kp.sign(message))
            .ok_or(CryptoError::NoPrivateKey)
    }

    /// Verify `signature` over `message` against the certificate's key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] on mismatch.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        self.public_key().verify(message, signature)
    }

    /// Drop the private key, keeping only what verification needs.
    #[must_use]
    pub fn into_verification_only(self) -> Self {
        Self {
            signer: None,
            certificate: self.certificate,
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("subject", &self.certificate.subject())
            .field("key_id", &self.public_key().key_id_hex())
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

fn read_file(path: &Path) -> CryptoResult<Zeroizing<Vec<u8>>> {
    std::fs::read(path)
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::IoError(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{OPENSSL_CERTIFICATE, OPENSSL_PRIVATE_KEY, OPENSSL_PUBLIC_KEY};

    #[test]
    fn test_generate_sign_verify() {
        let material = KeyMaterial::generate().unwrap();
        assert!(material.can_sign());

        let sig = material.sign(b"payload").unwrap();
        assert!(material.verify(b"payload", &sig).is_ok());
        assert!(material.verify(b"other", &sig).is_err());
    }

    #[test]
    fn test_pem_reload_matches() {
        let material = KeyMaterial::generate().unwrap();
        let private_pem = material.private_key_pem().unwrap();

        let reloaded =
            KeyMaterial::from_pem(Some(private_pem.as_bytes()), material.certificate_pem().as_bytes())
                .unwrap();
        assert_eq!(reloaded.public_key(), material.public_key());
        assert_eq!(reloaded.fingerprint(), material.fingerprint());
    }

    #[test]
    fn test_loads_openssl_key_and_certificate() {
        let material = KeyMaterial::from_pem(
            Some(OPENSSL_PRIVATE_KEY.as_bytes()),
            OPENSSL_CERTIFICATE.as_bytes(),
        )
        .unwrap();
        assert!(material.can_sign());
        assert!(material.certificate().subject().is_some());

        let sig = material.sign(b"m").unwrap();
        let spki_only = KeyMaterial::from_pem(None, OPENSSL_PUBLIC_KEY.as_bytes()).unwrap();
        assert!(spki_only.verify(b"m", &sig).is_ok());

        let mismatched = KeyMaterial::from_pem(
            Some(OPENSSL_PRIVATE_KEY.as_bytes()),
            KeyMaterial::generate().unwrap().certificate_pem().as_bytes(),
        );
        assert!(matches!(mismatched, Err(CryptoError::KeyMismatch)));
    }

    #[test]
    fn test_mismatched_private_key_is_fatal() {
        let a = KeyMaterial::generate().unwrap();
        let b = KeyMaterial::generate().unwrap();

        let result = KeyMaterial::from_pem(
            Some(a.private_key_pem().unwrap().as_bytes()),
            b.certificate_pem().as_bytes(),
        );
        assert!(matches!(result, Err(CryptoError::KeyMismatch)));
    }

    #[test]
    fn test_verification_only_cannot_sign() {
        let material = KeyMaterial::generate().unwrap();
        let sig = material.sign(b"m").unwrap();

        let verify_only = KeyMaterial::from_pem(None, material.certificate_pem().as_bytes()).unwrap();
        assert!(!verify_only.can_sign());
        assert!(verify_only.private_key_pem().is_err());
        assert!(matches!(verify_only.sign(b"m"), Err(CryptoError::NoPrivateKey)));
        assert!(verify_only.verify(b"m", &sig).is_ok());

        let stripped = material.into_verification_only();
        assert!(!stripped.can_sign());
    }

    #[test]
    fn test_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let material = KeyMaterial::generate().unwrap();

        let key_path = dir.path().join("proxy.key");
        let cert_path = dir.path().join("proxy.crt");
        std::fs::write(&key_path, material.private_key_pem().unwrap().as_bytes()).unwrap();
        std::fs::write(&cert_path, material.certificate_pem()).unwrap();

        let loaded = KeyMaterial::from_files(Some(&key_path), &cert_path).unwrap();
        assert!(loaded.can_sign());
        assert_eq!(loaded.public_key(), material.public_key());

        let missing = KeyMaterial::from_files(None, &dir.path().join("nope.crt"));
        assert!(matches!(missing, Err(CryptoError::IoError(_))));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let material = KeyMaterial::generate().unwrap();
        let debug = format!("{material:?}");
        assert!(debug.contains(&material.public_key().key_id_hex()));
        assert!(!debug.contains("PRIVATE KEY"));
    }
}
