//! Test harness helpers: key files on disk and logging.

use std::path::PathBuf;

use magicproxy_crypto::KeyMaterial;
use tempfile::TempDir;

/// Key material written to a temporary directory as PEM files.
///
/// The directory is removed when this value is dropped.
pub struct KeyFiles {
    /// Owning handle for the temporary directory.
    pub dir: TempDir,
    /// Path of the certificate PEM.
    pub certificate_path: PathBuf,
    /// Path of the private key PEM.
    pub private_key_path: PathBuf,
}

impl KeyFiles {
    /// Write `keys` out as `proxy.crt` and `proxy.key`.
    ///
    /// # Panics
    ///
    /// Panics if the files cannot be written or `keys` has no private key.
    #[must_use]
    pub fn write(keys: &KeyMaterial) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let certificate_path = dir.path().join("proxy.crt");
        let private_key_path = dir.path().join("proxy.key");

        std::fs::write(&certificate_path, keys.certificate_pem()).expect("write certificate");
        let private_pem = keys.private_key_pem().expect("signing key material");
        std::fs::write(&private_key_path, private_pem.as_bytes()).expect("write private key");

        Self {
            dir,
            certificate_path,
            private_key_path,
        }
    }
}

/// Install a test-writer tracing subscriber once per process.
///
/// Respects `RUST_LOG`; safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
