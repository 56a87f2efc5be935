//! Scope patterns and depth-exact path matching.
//!
//! A pattern is a fixed sequence of segments, each either a literal or the
//! wildcard `*`, paired with a [`VerbSet`]. A pattern of depth N only ever
//! matches request paths of exactly N segments. There is no recursive
//! wildcard; each depth from 1 to [`MAX_DEPTH`] is authorized independently.

use std::fmt;
use std::str::FromStr;

use crate::error::{TokenError, TokenResult};
use crate::verb::{Verb, VerbSet};

/// Deepest path a pattern may describe.
pub const MAX_DEPTH: usize = 15;

const WILDCARD: &str = "*";

/// One path segment of a [`ScopePattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Must equal the request segment exactly (case-sensitive).
    Literal(String),
    /// Matches any single non-empty segment.
    Wildcard,
}

impl Segment {
    /// Parse one segment of a path template.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidPattern`] for empty segments or literals
    /// containing `*`, `/`, `?`, `#`, whitespace, or control characters.
    pub fn parse(raw: &str) -> TokenResult<Self> {
        if raw == WILDCARD {
            return Ok(Self::Wildcard);
        }
        if raw.is_empty() {
            return Err(TokenError::InvalidPattern("empty path segment".to_owned()));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| matches!(c, '*' | '/' | '?' | '#') || c.is_whitespace() || c.is_control())
        {
            return Err(TokenError::InvalidPattern(format!(
                "segment '{}' contains forbidden character {c:?}",
                raw.escape_debug()
            )));
        }
        Ok(Self::Literal(raw.to_owned()))
    }

    /// Whether this segment accepts `candidate`.
    #[must_use]
    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == candidate,
            Self::Wildcard => !candidate.is_empty(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => f.write_str(lit),
            Self::Wildcard => f.write_str(WILDCARD),
        }
    }
}

/// The path template plus verb set a token authorizes.
///
/// Canonical text form is `VERBS PATH`, for example `GET,HEAD /repos/*/*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopePattern {
    segments: Vec<Segment>,
    verbs: VerbSet,
}

impl ScopePattern {
    /// Build a pattern from a path template such as `/repos/*/issues`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidPattern`] if the template does not start
    /// with `/`, has a bad segment, has depth outside `1..=MAX_DEPTH`, or
    /// `verbs` is empty.
    pub fn new(path: &str, verbs: VerbSet) -> TokenResult<Self> {
        let rest = path.strip_prefix('/').ok_or_else(|| {
            TokenError::InvalidPattern("path template must start with '/'".to_owned())
        })?;
        if rest.is_empty() {
            return Err(TokenError::InvalidPattern(
                "path template has no segments".to_owned(),
            ));
        }
        let segments = rest
            .split('/')
            .map(Segment::parse)
            .collect::<TokenResult<Vec<_>>>()?;
        Self::from_segments(segments, verbs)
    }

    /// Build a pattern from already-parsed segments.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidPattern`] on bad depth or an empty verb set.
    pub fn from_segments(segments: Vec<Segment>, verbs: VerbSet) -> TokenResult<Self> {
        if segments.is_empty() || segments.len() > MAX_DEPTH {
            return Err(TokenError::InvalidPattern(format!(
                "depth {} outside 1..={MAX_DEPTH}",
                segments.len()
            )));
        }
        if verbs.is_empty() {
            return Err(TokenError::InvalidPattern("no verbs granted".to_owned()));
        }
        if let Some(Segment::Literal(bad)) = segments
            .iter()
            .find(|s| matches!(s, Segment::Literal(l) if Segment::parse(l).is_err()))
        {
            return Err(TokenError::InvalidPattern(format!(
                "invalid literal segment '{}'",
                bad.escape_debug()
            )));
        }
        Ok(Self { segments, verbs })
    }

    /// A pattern of `depth` wildcards granting `verbs`.
    ///
    /// # Errors
    ///
    /// Same as [`from_segments`](Self::from_segments).
    pub fn wildcards(depth: usize, verbs: VerbSet) -> TokenResult<Self> {
        Self::from_segments(vec![Segment::Wildcard; depth], verbs)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The segments, in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Granted verbs.
    #[must_use]
    pub fn verbs(&self) -> VerbSet {
        self.verbs
    }

    /// Path template, e.g. `/repos/*/*`.
    #[must_use]
    pub fn path_template(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            out.push_str(&seg.to_string());
        }
        out
    }

    /// Check pre-split request segments and a verb against this pattern.
    #[must_use]
    pub fn matches(&self, path_segments: &[&str], verb: Verb) -> bool {
        self.verbs.contains(verb)
            && self.segments.len() == path_segments.len()
            && self
                .segments
                .iter()
                .zip(path_segments)
                .all(|(seg, candidate)| seg.accepts(candidate))
    }

    /// Check a raw request path (no query string) and a verb.
    #[must_use]
    pub fn matches_path(&self, raw_path: &str, verb: Verb) -> bool {
        let segments = split_path(raw_path);
        self.matches(&segments, verb)
    }
}

/// Split a request path into segments.
///
/// The leading `/` is removed; `/` and the empty string yield no segments.
/// Interior and trailing empty segments are kept so they can fail matching.
#[must_use]
pub fn split_path(raw_path: &str) -> Vec<&str> {
    let rest = raw_path.strip_prefix('/').unwrap_or(raw_path);
    if rest.is_empty() {
        return Vec::new();
    }
    rest.split('/').collect()
}

impl fmt::Display for ScopePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verbs, self.path_template())
    }
}

impl FromStr for ScopePattern {
    type Err = TokenError;

    /// Parses `VERBS PATH`, e.g. `GET,HEAD /*/*`.
    fn from_str(s: &str) -> TokenResult<Self> {
        let (verbs, path) = s.split_once(' ').ok_or_else(|| {
            TokenError::InvalidPattern("expected '<VERBS> <PATH>'".to_owned())
        })?;
        Self::new(path, verbs.parse()?)
    }
}
