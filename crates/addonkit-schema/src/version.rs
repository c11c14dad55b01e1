//! Dotted numeric versions.
//!
//! Addon versions and host versions share one format: a dot-separated list of
//! non-negative integers (`1`, `1.7`, `2.10.0`). Missing trailing components
//! count as zero, so `1`, `1.0` and `1.0.0` all have the same precedence.
//! Components are kept as normalized digit strings, which puts no bound on
//! their magnitude.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a version string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The string is empty or a segment is not a plain non-negative integer.
    #[error("Malformed version '{version}': {reason}")]
    Malformed {
        /// The offending input, verbatim.
        version: String,
        /// Which rule the input broke.
        reason: &'static str,
    },
}

/// A parsed dotted version.
///
/// Equality and hashing use the raw string, so `"1.0"` and `"1.0.0"` are two
/// distinct keys in a map. Ordering compares [`precedence`](Self::precedence)
/// first and falls back to the raw string, which keeps `Ord` total and
/// consistent with `Eq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    components: Vec<String>,
}

impl Version {
    /// Parse a dotted version string.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Malformed`] for an empty string, an empty
    /// segment, or a segment that is not all ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let malformed = |reason| VersionError::Malformed {
            version: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(malformed("empty version"));
        }

        let mut components = Vec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(malformed("empty segment"));
            }
            if !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed("segment is not a non-negative integer"));
            }
            let trimmed = segment.trim_start_matches('0');
            components.push(if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }

    /// The version exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric comparison with zero padding. `1.2` and `1.2.0` are `Equal`.
    pub fn precedence(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).map_or("0", String::as_str);
            let b = other.components.get(i).map_or("0", String::as_str);
            // Normalized digit strings: longer means larger.
            let ord = a.len().cmp(&b.len()).then_with(|| a.cmp(b));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// True when `self` is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.precedence(other) == Ordering::Greater
    }

    /// True when `self`, taken as the host version, meets the `min_required` version.
    pub fn satisfies(&self, min_required: &Self) -> bool {
        self.precedence(min_required) != Ordering::Less
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence(other).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.raw == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.raw == *other
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.raw
    }
}

/// Compare two version strings by precedence.
///
/// # Errors
///
/// Returns an error if either string is not a valid version.
pub fn compare(a: &str, b: &str) -> Result<Ordering, VersionError> {
    Ok(Version::parse(a)?.precedence(&Version::parse(b)?))
}

/// Whether `actual` meets the `min_required` version (`actual >= min_required`).
///
/// # Errors
///
/// Returns an error if either string is not a valid version.
pub fn is_compatible(min_required: &str, actual: &str) -> Result<bool, VersionError> {
    Ok(compare(actual, min_required)? != Ordering::Less)
}
