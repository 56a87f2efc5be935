//! Issue command: sign a token for a scope.

use anyhow::{Context, Result};
use chrono::Duration;
use magicproxy_config::Config;
use magicproxy_token::{MagicToken, ScopePattern};

use super::{KeyUse, load_keys};

/// Issue a token and print its wire form on stdout.
pub(crate) fn run(config: &Config, scope: &str, ttl: &str) -> Result<()> {
    let token = issue(config, scope, ttl)?;
    tracing::info!(
        scope = %token.scope(),
        expires_at = %token.expires_at().to_rfc3339(),
        "issued token"
    );
    println!("{}", token.encode());
    Ok(())
}

pub(crate) fn issue(config: &Config, scope: &str, ttl: &str) -> Result<MagicToken> {
    let scope: ScopePattern = scope
        .parse()
        .with_context(|| format!("invalid scope '{scope}'"))?;
    let ttl = parse_ttl(ttl)?;

    let max = config.token.max_ttl_secs;
    if ttl.num_seconds() > i64::try_from(max).unwrap_or(i64::MAX) {
        anyhow::bail!("ttl exceeds token.max_ttl_secs ({max}s)");
    }

    let keys = load_keys(config, KeyUse::Sign)?;
    Ok(MagicToken::issue(scope, ttl, &keys)?)
}

/// Parse `90`, `90s`, `15m`, `1h` or `7d`.
pub(crate) fn parse_ttl(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let amount: i64 = digits
        .parse()
        .with_context(|| format!("invalid ttl '{raw}'"))?;
    let unit_secs: i64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => anyhow::bail!("invalid ttl unit '{unit}' (use s, m, h or d)"),
    };

    amount
        .checked_mul(unit_secs)
        .and_then(Duration::try_seconds)
        .with_context(|| format!("ttl '{raw}' is out of range"))
}
