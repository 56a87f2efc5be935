//! The verification half of the key material.
//!
//! Two PEM forms are accepted:
//! - `CERTIFICATE`: an X.509 certificate whose subject key is ed25519
//! - `PUBLIC KEY`: a bare SubjectPublicKeyInfo
//!
//! The certificate is trust configuration supplied by the operator. Its own
//! signature and validity window are not checked; only the key is used.

use ed25519_dalek::VerifyingKey;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use x509_cert::der::pem::{self, LineEnding};
use x509_cert::der::{Decode, Encode};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::ContentHash;
use crate::keypair::{KeyPair, PublicKey};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// A loaded certificate or public key, and the ed25519 key it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    public_key: PublicKey,
    subject: Option<String>,
    der: Vec<u8>,
    pem: String,
}

impl Certificate {
    /// A `PUBLIC KEY` block for `keypair`, for generated material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if encoding fails.
    pub fn for_keypair(keypair: &KeyPair) -> CryptoResult<Self> {
        let der = keypair
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?
            .as_bytes()
            .to_vec();
        Self::from_der(PUBLIC_KEY_LABEL, der, None, keypair.export_public_key())
    }

    /// Parse a `CERTIFICATE` or `PUBLIC KEY` PEM block.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPem`] for bad framing or another label,
    /// and [`CryptoError::InvalidCertificate`] if the DER does not parse or
    /// the key is not ed25519.
    pub fn from_pem(input: &[u8]) -> CryptoResult<Self> {
        let (label, der) = pem::decode_vec(input.trim_ascii())
            .map_err(|e| CryptoError::InvalidPem(e.to_string()))?;

        let (spki, subject) = match label {
            CERTIFICATE_LABEL => {
                let cert = x509_cert::Certificate::from_der(&der)
                    .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
                let spki = cert
                    .tbs_certificate
                    .subject_public_key_info
                    .to_der()
                    .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
                (spki, Some(cert.tbs_certificate.subject.to_string()))
            },
            PUBLIC_KEY_LABEL => (der.clone(), None),
            other => {
                return Err(CryptoError::InvalidPem(format!(
                    "expected {CERTIFICATE_LABEL} or {PUBLIC_KEY_LABEL}, found {other}"
                )));
            },
        };

        let key = VerifyingKey::from_public_key_der(&spki).map_err(|e| {
            CryptoError::InvalidCertificate(format!("not an ed25519 public key: {e}"))
        })?;
        Self::from_der(label, der, subject, PublicKey::from_bytes(key.to_bytes()))
    }

    fn from_der(
        label: &str,
        der: Vec<u8>,
        subject: Option<String>,
        public_key: PublicKey,
    ) -> CryptoResult<Self> {
        let pem = pem::encode_string(label, LineEnding::LF, &der)
            .map_err(|e| CryptoError::InvalidPem(e.to_string()))?;
        Ok(Self {
            public_key,
            subject,
            der,
            pem,
        })
    }

    /// The X.509 subject in RFC 4514 form, when loaded from a certificate.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The certified public key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Normalized PEM text (LF line endings, one block).
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// BLAKE3 fingerprint of the DER encoding.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::hash(&self.der)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{
        OPENSSL_CERTIFICATE, OPENSSL_P256_CERTIFICATE, OPENSSL_PRIVATE_KEY, OPENSSL_PUBLIC_KEY,
    };

    #[test]
    fn test_loads_x509_certificate() {
        let cert = Certificate::from_pem(OPENSSL_CERTIFICATE.as_bytes()).unwrap();
        let keypair = KeyPair::from_pem(OPENSSL_PRIVATE_KEY.as_bytes()).unwrap();

        assert_eq!(cert.public_key(), &keypair.export_public_key());
        let subject = cert.subject().unwrap();
        assert!(subject.contains("magicproxy-test"), "{subject}");
        assert_eq!(cert.pem().trim_end(), OPENSSL_CERTIFICATE.trim_end());
    }

    #[test]
    fn test_loads_bare_public_key() {
        let cert = Certificate::from_pem(OPENSSL_PUBLIC_KEY.as_bytes()).unwrap();
        let x509 = Certificate::from_pem(OPENSSL_CERTIFICATE.as_bytes()).unwrap();

        assert_eq!(cert.public_key(), x509.public_key());
        assert!(cert.subject().is_none());
        assert_ne!(cert.fingerprint(), x509.fingerprint());
    }

    #[test]
    fn test_generated_public_key_reloads() {
        let keypair = KeyPair::generate();
        let cert = Certificate::for_keypair(&keypair).unwrap();
        assert!(cert.pem().starts_with("-----BEGIN PUBLIC KEY-----"));

        let reloaded = Certificate::from_pem(cert.pem().as_bytes()).unwrap();
        assert_eq!(reloaded, cert);
        assert_eq!(reloaded.fingerprint(), cert.fingerprint());
    }

    #[test]
    fn test_tolerates_crlf_and_surrounding_blank_lines() {
        let crlf = format!("\r\n{}\r\n", OPENSSL_CERTIFICATE.replace('\n', "\r\n"));
        let cert = Certificate::from_pem(crlf.as_bytes()).unwrap();
        assert_eq!(cert.pem().trim_end(), OPENSSL_CERTIFICATE.trim_end());
    }

    #[test]
    fn test_rejects_non_ed25519_certificate() {
        assert!(matches!(
            Certificate::from_pem(OPENSSL_P256_CERTIFICATE.as_bytes()),
            Err(CryptoError::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_rejects_other_labels_and_garbage() {
        assert!(matches!(
            Certificate::from_pem(OPENSSL_PRIVATE_KEY.as_bytes()),
            Err(CryptoError::InvalidPem(_))
        ));
        assert!(matches!(
            Certificate::from_pem(b"not pem"),
            Err(CryptoError::InvalidPem(_))
        ));

        let truncated =
            OPENSSL_CERTIFICATE.replace("rcmkIIrSwiqrLH0dFzONOG3RlLjhlsoI4hvLWvhM3sKXNQ4=\n", "");
        assert!(Certificate::from_pem(truncated.as_bytes()).is_err());
    }
}
