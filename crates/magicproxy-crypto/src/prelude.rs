//! Prelude module - commonly used types for convenient import.
//!
//! Use `use magicproxy_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Keys and signatures
pub use crate::{KeyPair, PublicKey, Signature};

// Certificates and loaded material
pub use crate::{Certificate, KeyMaterial};

// Hashing
pub use crate::ContentHash;
