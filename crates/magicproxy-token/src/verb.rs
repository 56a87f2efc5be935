//! HTTP verbs a scope can grant.

use std::fmt;
use std::str::FromStr;

use crate::error::{TokenError, TokenResult};

/// A verb the proxy forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `PATCH`
    Patch,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Verb {
    /// Every verb, in canonical encoding order.
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::Head,
        Self::Patch,
        Self::Put,
        Self::Post,
        Self::Delete,
    ];

    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Get => 1,
            Self::Head => 1 << 1,
            Self::Patch => 1 << 2,
            Self::Put => 1 << 3,
            Self::Post => 1 << 4,
            Self::Delete => 1 << 5,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = TokenError;

    /// Parses a method name, case-insensitively.
    fn from_str(s: &str) -> TokenResult<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TokenError::InvalidPattern(format!("unsupported verb '{s}'")))
    }
}

/// A set of [`Verb`]s.
///
/// Displays as a comma-separated list in canonical order, e.g. `GET,HEAD`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VerbSet(u8);

impl VerbSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// All six verbs.
    #[must_use]
    pub const fn all() -> Self {
        Self(0b0011_1111)
    }

    /// Read-only verbs (`GET`, `HEAD`).
    #[must_use]
    pub const fn read_only() -> Self {
        Self(Verb::Get.bit() | Verb::Head.bit())
    }

    /// Build from any collection of verbs.
    #[must_use]
    pub fn from_verbs(verbs: impl IntoIterator<Item = Verb>) -> Self {
        verbs.into_iter().fold(Self::empty(), Self::with)
    }

    /// Add a verb.
    #[must_use]
    pub const fn with(self, verb: Verb) -> Self {
        Self(self.0 | verb.bit())
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(self, verb: Verb) -> bool {
        self.0 & verb.bit() != 0
    }

    /// Whether no verb is granted.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Verb> {
        Verb::ALL.into_iter().filter(move |v| self.contains(*v))
    }
}

impl fmt::Display for VerbSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, verb) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(verb.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for VerbSet {
    type Err = TokenError;

    /// Parses a comma-separated verb list. Order and case are free here;
    /// token parsing separately insists on the canonical rendering.
    fn from_str(s: &str) -> TokenResult<Self> {
        let mut set = Self::empty();
        for item in s.split(',') {
            if item.is_empty() {
                return Err(TokenError::InvalidPattern("empty verb in list".to_owned()));
            }
            set = set.with(item.parse()?);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_canonical_order() {
        let set = VerbSet::from_verbs([Verb::Delete, Verb::Get, Verb::Put]);
        assert_eq!(set.to_string(), "GET,PUT,DELETE");
        assert_eq!(VerbSet::all().to_string(), "GET,HEAD,PATCH,PUT,POST,DELETE");
    }

    #[test]
    fn test_parse_any_order_and_case() {
        let set: VerbSet = "post,Get".parse().unwrap();
        assert!(set.contains(Verb::Get));
        assert!(set.contains(Verb::Post));
        assert!(!set.contains(Verb::Head));
        assert_eq!(set.to_string(), "GET,POST");
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert!("GET,OPTIONS".parse::<VerbSet>().is_err());
        assert!("GET,,HEAD".parse::<VerbSet>().is_err());
        assert!("".parse::<VerbSet>().is_err());
        assert!("TRACE".parse::<Verb>().is_err());
    }

    #[test]
    fn test_set_membership() {
        let ro = VerbSet::read_only();
        assert!(ro.contains(Verb::Get));
        assert!(ro.contains(Verb::Head));
        assert!(!ro.contains(Verb::Patch));
        assert!(VerbSet::empty().is_empty());
        assert_eq!(VerbSet::all().iter().count(), 6);
    }
}
