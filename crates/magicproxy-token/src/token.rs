//! Magic token issuance, wire encoding, and verification.
//!
//! Wire format, three dot-separated unpadded base64url fields:
//!
//! ```text
//! b64url("GET,HEAD /*/*") . b64url("<issued>:<expires>") . b64url(signature)
//! ```
//!
//! Every token has exactly one accepted encoding; [`MagicToken::parse`]
//! rejects anything that does not re-encode to the same text.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use magicproxy_crypto::{KeyMaterial, Signature};

use crate::error::{TokenError, TokenResult};
use crate::pattern::ScopePattern;
use crate::verb::Verb;

/// Longest token text `parse` will look at.
pub const MAX_TOKEN_LEN: usize = 4096;

const SIGNING_VERSION: u8 = 1;

/// A signed capability: one scope pattern plus a validity interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicToken {
    scope: ScopePattern,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    signature: Signature,
}

impl MagicToken {
    /// Issue a token valid from now for `ttl`.
    ///
    /// # Errors
    ///
    /// See [`issue_at`](Self::issue_at).
    pub fn issue(scope: ScopePattern, ttl: Duration, keys: &KeyMaterial) -> TokenResult<Self> {
        Self::issue_at(scope, Utc::now(), ttl, keys)
    }

    /// Issue a token valid from `now` (truncated to whole seconds) for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidInterval`] if `ttl` is under one second or
    /// the expiry falls outside the representable date range, and
    /// [`TokenError::Signing`] if `keys` holds no private key.
    pub fn issue_at(
        scope: ScopePattern,
        now: DateTime<Utc>,
        ttl: Duration,
        keys: &KeyMaterial,
    ) -> TokenResult<Self> {
        let issued_secs = now.timestamp();
        let expires_secs = issued_secs.saturating_add(ttl.num_seconds());
        let invalid = || TokenError::InvalidInterval {
            issued_at: issued_secs,
            expires_at: expires_secs,
        };
        if expires_secs <= issued_secs {
            return Err(invalid());
        }
        let issued_at = from_secs(issued_secs).ok_or_else(invalid)?;
        let expires_at = from_secs(expires_secs).ok_or_else(invalid)?;

        let data = signing_data(&scope, issued_secs, expires_secs)?;
        let signature = keys
            .sign(&data)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(Self {
            scope,
            issued_at,
            expires_at,
            signature,
        })
    }

    /// The authorized scope.
    #[must_use]
    pub fn scope(&self) -> &ScopePattern {
        &self.scope
    }

    /// Start of the validity interval.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// End of the validity interval (exclusive).
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Render the wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(self.scope.to_string()),
            URL_SAFE_NO_PAD.encode(self.interval_text()),
            self.signature.to_base64url()
        )
    }

    /// Decode the wire form. Checks structure only, not signature or time.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] for anything that is not the
    /// canonical encoding of a token.
    pub fn parse(text: &str) -> TokenResult<Self> {
        if text.len() > MAX_TOKEN_LEN {
            return Err(malformed("token too long"));
        }
        let mut fields = text.split('.');
        let (Some(scope_b64), Some(interval_b64), Some(sig_b64), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed("expected three dot-separated fields"));
        };

        let scope_text = decode_utf8(scope_b64, "scope")?;
        let scope: ScopePattern = scope_text
            .parse()
            .map_err(|e: TokenError| malformed(&format!("scope: {e}")))?;

        let interval = decode_utf8(interval_b64, "interval")?;
        let (issued, expires) = interval
            .split_once(':')
            .ok_or_else(|| malformed("interval must be '<issued>:<expires>'"))?;
        let issued_secs: i64 = issued
            .parse()
            .map_err(|_| malformed("issued_at is not an integer"))?;
        let expires_secs: i64 = expires
            .parse()
            .map_err(|_| malformed("expires_at is not an integer"))?;

        let signature =
            Signature::from_base64url(sig_b64).map_err(|_| malformed("bad signature field"))?;

        let token = Self {
            scope,
            issued_at: from_secs(issued_secs).ok_or_else(|| malformed("issued_at out of range"))?,
            expires_at: from_secs(expires_secs)
                .ok_or_else(|| malformed("expires_at out of range"))?,
            signature,
        };

        if token.encode() != text {
            return Err(malformed("non-canonical encoding"));
        }
        Ok(token)
    }

    /// Check interval sanity, signature, and time, in that order.
    ///
    /// `now` is valid when `issued_at - skew <= now < expires_at + skew`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidInterval`], [`TokenError::InvalidSignature`],
    /// [`TokenError::Expired`], or [`TokenError::NotYetValid`].
    pub fn verify(&self, keys: &KeyMaterial, now: DateTime<Utc>, skew: Duration) -> TokenResult<()> {
        let issued_secs = self.issued_at.timestamp();
        let expires_secs = self.expires_at.timestamp();
        if issued_secs >= expires_secs {
            return Err(TokenError::InvalidInterval {
                issued_at: issued_secs,
                expires_at: expires_secs,
            });
        }

        let data =
            signing_data(&self.scope, issued_secs, expires_secs).map_err(|_| TokenError::InvalidSignature)?;
        keys.verify(&data, &self.signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let expiry_edge = self
            .expires_at
            .checked_add_signed(skew)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now >= expiry_edge {
            return Err(TokenError::Expired {
                expires_at: expires_secs,
            });
        }

        let start_edge = self
            .issued_at
            .checked_sub_signed(skew)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if now < start_edge {
            return Err(TokenError::NotYetValid {
                issued_at: issued_secs,
            });
        }
        Ok(())
    }

    /// Whether the scope admits `verb` on `path`. Does not verify the token.
    #[must_use]
    pub fn grants(&self, path: &str, verb: Verb) -> bool {
        self.scope.matches_path(path, verb)
    }

    /// Remaining lifetime at `now`, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at
            .signed_duration_since(now)
            .max(Duration::zero())
    }

    fn interval_text(&self) -> String {
        format!("{}:{}", self.issued_at.timestamp(), self.expires_at.timestamp())
    }
}

/// Canonical bytes the signature covers.
///
/// `version(1) | u32 LE scope length | scope | i64 LE issued | i64 LE expires`
fn signing_data(scope: &ScopePattern, issued_secs: i64, expires_secs: i64) -> TokenResult<Vec<u8>> {
    let scope_text = scope.to_string();
    let scope_len = u32::try_from(scope_text.len())
        .map_err(|_| TokenError::Signing("scope too long".to_owned()))?;

    let mut data = Vec::with_capacity(scope_text.len().saturating_add(21));
    data.push(SIGNING_VERSION);
    data.extend_from_slice(&scope_len.to_le_bytes());
    data.extend_from_slice(scope_text.as_bytes());
    data.extend_from_slice(&issued_secs.to_le_bytes());
    data.extend_from_slice(&expires_secs.to_le_bytes());
    Ok(data)
}

fn from_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn decode_utf8(field: &str, what: &str) -> TokenResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(field)
        .map_err(|_| malformed(&format!("{what} is not base64url")))?;
    String::from_utf8(bytes).map_err(|_| malformed(&format!("{what} is not UTF-8")))
}

fn malformed(reason: &str) -> TokenError {
    TokenError::Malformed(reason.to_owned())
}

impl fmt::Display for MagicToken {
    /// Redacted summary: scope and interval, never the signature.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} .. {})",
            self.scope,
            self.issued_at.to_rfc3339(),
            self.expires_at.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verb::VerbSet;

    fn keys() -> KeyMaterial {
        KeyMaterial::generate().unwrap()
    }

    fn scope() -> ScopePattern {
        ScopePattern::new("/*/*", VerbSet::from_verbs([Verb::Get])).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys).unwrap();

        assert_eq!(token.issued_at(), at(1_000));
        assert_eq!(token.expires_at(), at(1_060));
        assert!(token.verify(&keys, at(1_000), Duration::zero()).is_ok());
        assert!(token.verify(&keys, at(1_059), Duration::zero()).is_ok());
    }

    #[test]
    fn test_issue_truncates_to_seconds() {
        let keys = keys();
        let now = DateTime::from_timestamp(1_000, 999_000_000).unwrap();
        let token = MagicToken::issue_at(scope(), now, Duration::seconds(10), &keys).unwrap();
        assert_eq!(token.issued_at(), at(1_000));

        let parsed = MagicToken::parse(&token.encode()).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_issue_rejects_short_ttl() {
        let keys = keys();
        for ttl in [Duration::zero(), Duration::milliseconds(500), Duration::seconds(-5)] {
            let result = MagicToken::issue_at(scope(), at(1_000), ttl, &keys);
            assert!(matches!(result, Err(TokenError::InvalidInterval { .. })));
        }
    }

    #[test]
    fn test_issue_rejects_unrepresentable_expiry() {
        let keys = keys();
        let result = MagicToken::issue_at(scope(), at(1_000), Duration::MAX, &keys);
        assert!(matches!(result, Err(TokenError::InvalidInterval { .. })));

        let near_end = DateTime::<Utc>::MAX_UTC
            .checked_sub_signed(Duration::days(1))
            .unwrap();
        let result = MagicToken::issue_at(scope(), near_end, Duration::days(30), &keys);
        assert!(matches!(
            result,
            Err(TokenError::InvalidInterval { issued_at, .. }) if issued_at == near_end.timestamp()
        ));
    }

    #[test]
    fn test_issue_without_private_key() {
        let keys = keys().into_verification_only();
        let result = MagicToken::issue(scope(), Duration::hours(1), &keys);
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_encode_parse_preserves_fields() {
        let keys = keys();
        let token = MagicToken::issue(scope(), Duration::hours(1), &keys).unwrap();
        let wire = token.encode();

        assert_eq!(wire.split('.').count(), 3);
        let parsed = MagicToken::parse(&wire).unwrap();
        assert_eq!(parsed, token);
        assert_eq!(parsed.encode(), wire);
        assert!(parsed.verify(&keys, Utc::now(), Duration::zero()).is_ok());
    }

    #[test]
    fn test_expired_boundary() {
        let keys = keys();
        let token = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys).unwrap();

        let result = token.verify(&keys, at(1_060), Duration::zero());
        assert_eq!(result, Err(TokenError::Expired { expires_at: 1_060 }));

        // Skew extends the window on both sides.
        assert!(token.verify(&keys, at(1_060), Duration::seconds(5)).is_ok());
        assert!(token.verify(&keys, at(995), Duration::seconds(5)).is_ok());
    }

    #[test]
    fn test_not_yet_valid() {
        let keys = keys();
        let token = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys).unwrap();

        let result = token.verify(&keys, at(999), Duration::zero());
        assert_eq!(result, Err(TokenError::NotYetValid { issued_at: 1_000 }));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let keys = keys();
        let other = KeyMaterial::generate().unwrap();
        let token = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys).unwrap();

        // Expired and signed by the wrong key: the signature failure wins.
        let result = token.verify(&other, at(5_000), Duration::zero());
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_scope_fails() {
        let keys = keys();
        let token = MagicToken::issue(scope(), Duration::hours(1), &keys).unwrap();
        let wire = token.encode();
        let (_, rest) = wire.split_once('.').unwrap();

        let broader = URL_SAFE_NO_PAD.encode("GET,POST /*/*");
        let forged = MagicToken::parse(&format!("{broader}.{rest}")).unwrap();
        assert_eq!(
            forged.verify(&keys, Utc::now(), Duration::zero()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_interval_fails() {
        let keys = keys();
        let token = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys).unwrap();
        let wire = token.encode();
        let parts: Vec<&str> = wire.split('.').collect();

        let extended = URL_SAFE_NO_PAD.encode("1000:999999");
        let forged = MagicToken::parse(&format!("{}.{extended}.{}", parts[0], parts[2])).unwrap();
        assert_eq!(
            forged.verify(&keys, at(1_010), Duration::zero()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_zero_signature_fails() {
        let keys = keys();
        let token = MagicToken::issue(scope(), Duration::hours(1), &keys).unwrap();
        let forged = MagicToken {
            signature: Signature::from_bytes([0u8; 64]),
            ..token
        };
        assert_eq!(
            forged.verify(&keys, Utc::now(), Duration::zero()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_inverted_interval_rejected_even_if_signed() {
        let keys = keys();
        let data = signing_data(&scope(), 2_000, 1_000).unwrap();
        let token = MagicToken {
            scope: scope(),
            issued_at: at(2_000),
            expires_at: at(1_000),
            signature: keys.sign(&data).unwrap(),
        };
        assert_eq!(
            token.verify(&keys, at(1_500), Duration::zero()),
            Err(TokenError::InvalidInterval {
                issued_at: 2_000,
                expires_at: 1_000
            })
        );

        let empty = MagicToken {
            expires_at: at(2_000),
            ..token
        };
        assert!(matches!(
            empty.verify(&keys, at(2_000), Duration::zero()),
            Err(TokenError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_structural_garbage() {
        let keys = keys();
        let wire = MagicToken::issue(scope(), Duration::hours(1), &keys)
            .unwrap()
            .encode();
        let parts: Vec<&str> = wire.split('.').collect();

        let cases = vec![
            String::new(),
            "abc".to_owned(),
            format!("{}.{}", parts[0], parts[1]),
            format!("{wire}.extra"),
            format!("{}=.{}.{}", parts[0], parts[1], parts[2]),
            format!("!!.{}.{}", parts[1], parts[2]),
            format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode("soon:later"), parts[2]),
            format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode("1000"), parts[2]),
            format!("{}.{}.{}", URL_SAFE_NO_PAD.encode("GET /"), parts[1], parts[2]),
            format!("{}.{}.{}", parts[0], parts[1], URL_SAFE_NO_PAD.encode([1u8; 32])),
            "a".repeat(5_000),
        ];
        for case in cases {
            assert!(
                matches!(MagicToken::parse(&case), Err(TokenError::Malformed(_))),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical_encodings() {
        let keys = keys();
        let wire = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys)
            .unwrap()
            .encode();
        let parts: Vec<&str> = wire.split('.').collect();

        let lowercase_verbs = URL_SAFE_NO_PAD.encode("get /*/*");
        let leading_zero = URL_SAFE_NO_PAD.encode("01000:1060");
        let plus_sign = URL_SAFE_NO_PAD.encode("+1000:1060");

        for case in [
            format!("{lowercase_verbs}.{}.{}", parts[1], parts[2]),
            format!("{}.{leading_zero}.{}", parts[0], parts[2]),
            format!("{}.{plus_sign}.{}", parts[0], parts[2]),
        ] {
            assert!(
                matches!(MagicToken::parse(&case), Err(TokenError::Malformed(_))),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn test_grants_is_depth_exact() {
        let keys = keys();
        let token = MagicToken::issue(scope(), Duration::hours(1), &keys).unwrap();

        assert!(token.grants("/octocat/Hello-World", Verb::Get));
        assert!(!token.grants("/octocat", Verb::Get));
        assert!(!token.grants("/octocat/Hello-World/issues", Verb::Get));
        assert!(!token.grants("/octocat/Hello-World", Verb::Delete));
    }

    #[test]
    fn test_display_hides_signature() {
        let keys = keys();
        let token = MagicToken::issue(scope(), Duration::hours(1), &keys).unwrap();
        let shown = token.to_string();
        assert!(shown.starts_with("GET /*/*"));
        assert!(!shown.contains(&token.signature.to_base64url()));
    }

    #[test]
    fn test_remaining() {
        let keys = keys();
        let token = MagicToken::issue_at(scope(), at(1_000), Duration::seconds(60), &keys).unwrap();
        assert_eq!(token.remaining(at(1_030)), Duration::seconds(30));
        assert_eq!(token.remaining(at(2_000)), Duration::zero());
    }
}
