//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context, Result};
use magicproxy_config::Config;
use magicproxy_crypto::KeyMaterial;

pub(crate) mod inspect;
pub(crate) mod issue;
pub(crate) mod serve;

/// Which halves of the key material a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyUse {
    /// Certificate only; a configured private key is still loaded and
    /// checked against it.
    Verify,
    /// Private key required.
    Sign,
}

/// Load key material from the paths in `[keys]`.
pub(crate) fn load_keys(config: &Config, usage: KeyUse) -> Result<KeyMaterial> {
    let private_key = match (usage, config.keys.private_key_path.as_deref()) {
        (_, Some(path)) => Some(Path::new(path)),
        (KeyUse::Sign, None) => {
            anyhow::bail!("keys.private_key_path must be set to issue tokens")
        },
        (KeyUse::Verify, None) => None,
    };
    let certificate = Path::new(&config.keys.certificate_path);

    KeyMaterial::from_files(private_key, certificate).with_context(|| {
        format!(
            "failed to load key material (certificate {})",
            certificate.display()
        )
    })
}
