//! magicproxy Crypto - signing keys and certificates for magic tokens.
//!
//! This crate provides:
//! - Ed25519 key pairs with secure memory handling, loaded from PKCS#8 PEM
//! - [`Certificate`], the verifying key from an X.509 certificate or SPKI block
//! - [`KeyMaterial`], the immutable bundle the proxy loads at startup
//!
//! # Example
//!
//! ```
//! use magicproxy_crypto::KeyMaterial;
//!
//! // Generate fresh material (normally loaded from decrypted PEM files)
//! let material = KeyMaterial::generate().unwrap();
//!
//! let message = b"canonical token bytes";
//! let signature = material.sign(message).unwrap();
//! assert!(material.verify(message, &signature).is_ok());
//!
//! // Reload from PEM, verifying the private key matches the certificate
//! let reloaded = KeyMaterial::from_pem(
//!     Some(material.private_key_pem().unwrap().as_bytes()),
//!     material.certificate_pem().as_bytes(),
//! )
//! .unwrap();
//! assert_eq!(reloaded.public_key(), material.public_key());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod certificate;
mod error;
mod hash;
mod keypair;
mod material;
mod signature;
#[cfg(test)]
mod testdata;

pub use certificate::Certificate;
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, PublicKey};
pub use material::KeyMaterial;
pub use signature::Signature;
