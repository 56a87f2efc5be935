//! Serve command: run the proxy until shut down.

use std::sync::Arc;

use anyhow::{Context, Result};
use magicproxy_config::{Config, Credential};
use magicproxy_gateway::AppContext;

use super::{KeyUse, load_keys};

/// Load keys and credential, then serve on `server.bind_addr()`.
pub(crate) async fn run(config: &Config) -> Result<()> {
    let keys = load_keys(config, KeyUse::Verify)?;
    tracing::info!(
        subject = keys.certificate().subject().unwrap_or("-"),
        fingerprint = %keys.fingerprint(),
        "loaded proxy certificate"
    );

    let credential = Credential::from_env(&config.upstream.credential_env)?;
    let ctx = AppContext::from_config(config, keys, credential)
        .context("failed to build proxy state")?;

    let addr = config.server.bind_addr();
    magicproxy_gateway::run(&addr, Arc::new(ctx))
        .await
        .with_context(|| format!("proxy on {addr} failed"))
}
