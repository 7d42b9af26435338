//! Release version tags.

use anyhow::Result;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::errors::BootstrapError;

/// A `v`-prefixed semantic version tag such as `v1.2.3`.
///
/// Two tags are equal only when their strings are identical; this is what
/// decides whether the cached binary is current. [`VersionTag::cmp_semver`]
/// exists for reporting ("update available"), not for that decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    /// Parses a tag, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidVersion`] if the tag has no `v`
    /// prefix or the rest is not a semantic version.
    pub fn parse(raw: &str) -> Result<Self> {
        let tag = raw.trim();
        let valid = tag
            .strip_prefix('v')
            .is_some_and(|rest| semver::Version::parse(rest).is_ok());
        if valid {
            Ok(Self(tag.to_string()))
        } else {
            Err(BootstrapError::invalid_version(tag).into())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tag without its `v` prefix, as used in artifact file names.
    #[must_use]
    pub fn without_prefix(&self) -> &str {
        &self.0[1..]
    }

    /// Compares two tags by semantic version precedence.
    #[must_use]
    pub fn cmp_semver(&self, other: &Self) -> Ordering {
        match (
            semver::Version::parse(self.without_prefix()),
            semver::Version::parse(other.without_prefix()),
        ) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl FromStr for VersionTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
