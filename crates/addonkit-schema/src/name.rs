//! Validated addon names.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use thiserror::Error;

/// Errors raised when a string cannot be used as an addon name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty.
    #[error("Addon name is empty")]
    Empty,

    /// The name would escape the artifact directory or is otherwise unusable
    /// inside a file name.
    #[error("Invalid addon name '{0}': must not contain path separators or be '.'/'..'")]
    Unsafe(String),
}

/// An addon name as it appears in the catalog and in artifact file names.
///
/// Unlike package names elsewhere, addon names are case-sensitive: `Commands`
/// and `commands` are different addons with different artifact files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddonName(String);

impl AddonName {
    /// Create a name, rejecting anything that cannot be a plain file-name prefix.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] for an empty name, `.`, `..`, or a name holding a
    /// path separator or NUL.
    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(NameError::Unsafe(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AddonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for AddonName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for AddonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AddonName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AddonName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AddonName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<&str> for AddonName {
    type Error = NameError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for AddonName {
    type Error = NameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<AddonName> for String {
    fn from(name: AddonName) -> Self {
        name.0
    }
}
