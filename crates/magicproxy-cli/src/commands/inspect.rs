//! Inspect command: decode a token and check it against the certificate.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use magicproxy_config::Config;
use magicproxy_token::{MagicToken, TokenError};

use super::{KeyUse, load_keys};

/// Print the token's scope, interval and validity. Fails if it is not valid.
pub(crate) fn run(config: &Config, text: &str) -> Result<()> {
    let (token, verdict) = inspect(config, text)?;

    println!("scope:      {}", token.scope());
    println!("issued_at:  {}", token.issued_at().to_rfc3339());
    println!("expires_at: {}", token.expires_at().to_rfc3339());

    match verdict {
        Ok(()) => {
            let remaining = token.remaining(Utc::now());
            println!("status:     valid ({}s remaining)", remaining.num_seconds());
            Ok(())
        },
        Err(e) => {
            println!("status:     invalid ({e})");
            Err(e).context("token did not verify")
        },
    }
}

/// Parse `text` and verify it now, using the configured clock skew.
///
/// Parse failures are errors; verification failures are returned as the
/// verdict so the decoded fields can still be shown.
pub(crate) fn inspect(
    config: &Config,
    text: &str,
) -> Result<(MagicToken, Result<(), TokenError>)> {
    let token = MagicToken::parse(text.trim()).context("failed to decode token")?;
    let keys = load_keys(config, KeyUse::Verify)?;
    let skew = i64::try_from(config.token.clock_skew_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .context("token.clock_skew_secs is out of range")?;

    let verdict = token.verify(&keys, Utc::now(), skew);
    Ok((token, verdict))
}

#[cfg(test)]
mod tests {
    use magicproxy_test::{KeyFiles, expired_token, issue_token, test_key_material};

    use super::*;
    use crate::commands::tests::config_for;

    #[test]
    fn test_inspect_valid_token() {
        let keys = test_key_material();
        let files = KeyFiles::write(&keys);
        let text = issue_token(&keys, "GET /user");

        let (token, verdict) = inspect(&config_for(&files), &text).unwrap();
        assert!(verdict.is_ok());
        assert_eq!(token.scope().to_string(), "GET /user");
    }

    #[test]
    fn test_inspect_reports_expiry() {
        let keys = test_key_material();
        let files = KeyFiles::write(&keys);
        let text = expired_token(&keys, "GET /user");

        let (_, verdict) = inspect(&config_for(&files), &text).unwrap();
        assert!(matches!(verdict, Err(TokenError::Expired { .. })));
        assert!(run(&config_for(&files), &text).is_err());
    }

    #[test]
    fn test_inspect_foreign_token() {
        let files = KeyFiles::write(&test_key_material());
        let text = issue_token(&test_key_material(), "GET /user");

        let (_, verdict) = inspect(&config_for(&files), &text).unwrap();
        assert!(matches!(verdict, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_inspect_garbage_fails() {
        let files = KeyFiles::write(&test_key_material());
        assert!(inspect(&config_for(&files), "garbage").is_err());
    }
}
