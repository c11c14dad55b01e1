//! The remotely published addon catalog.
//!
//! ```json
//! {
//!   "baseURL": "https://github.com/Example/",
//!   "extensions": {
//!     "Commands": {
//!       "description": "Adds commands",
//!       "versions": { "2.1.0": "1.7.1", "2.0.0": "1.1.5" }
//!     }
//!   }
//! }
//! ```
//!
//! Each entry of `versions` maps an addon version to the minimum host version
//! it runs on. The envelope is decoded strictly; below it, a malformed addon or
//! version entry is dropped and recorded in [`Catalog::rejected`] so the rest
//! of the catalog stays usable.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::name::AddonName;
use crate::version::{Version, VersionError};

/// Errors decoding a catalog document.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The document does not match the catalog envelope.
    #[error("Malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Catalog entry for one addon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonInfo {
    /// Human-readable description, if the catalog provides one.
    pub description: Option<String>,
    /// Addon version mapped to the minimum host version it requires.
    pub versions: BTreeMap<Version, Version>,
}

impl AddonInfo {
    /// Minimum host version required by `version`, if the catalog lists it verbatim.
    pub fn min_host_version(&self, version: &str) -> Option<&Version> {
        self.versions
            .iter()
            .find(|(v, _)| v.as_str() == version)
            .map(|(_, min)| min)
    }
}

/// Something in the document that had to be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// The addon key as written in the document.
    pub addon: String,
    /// The version key, when only one version entry was skipped.
    pub version: Option<String>,
    /// Why it was skipped.
    pub reason: String,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {}: {}", self.addon, v, self.reason),
            None => write!(f, "{}: {}", self.addon, self.reason),
        }
    }
}

/// A decoded catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Prefix for artifact download URLs.
    pub base_url: String,
    /// Every addon that decoded cleanly.
    pub addons: BTreeMap<AddonName, AddonInfo>,
    /// Entries dropped during decoding.
    pub rejected: Vec<Rejection>,
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(rename = "baseURL")]
    base_url: String,
    #[serde(alias = "addons")]
    extensions: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawAddonInfo {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    versions: BTreeMap<String, serde_json::Value>,
}

impl Catalog {
    /// Decode a catalog from its JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Malformed`] if the envelope does not decode.
    /// Bad entries below it are collected in [`Catalog::rejected`] instead.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_slice(bytes)?;
        let mut catalog = Catalog {
            base_url: raw.base_url,
            ..Catalog::default()
        };

        for (key, value) in raw.extensions {
            let name = match AddonName::new(&key) {
                Ok(name) => name,
                Err(e) => {
                    catalog.reject(&key, None, e.to_string());
                    continue;
                }
            };

            let info: RawAddonInfo = match serde_json::from_value(value) {
                Ok(info) => info,
                Err(e) => {
                    catalog.reject(&key, None, e.to_string());
                    continue;
                }
            };

            let mut versions = BTreeMap::new();
            for (version, min_host) in info.versions {
                let parsed = Version::parse(&version).and_then(|v| match &min_host {
                    serde_json::Value::String(min) => Version::parse(min).map(|min| (v, min)),
                    other => Err(VersionError::Malformed {
                        version: other.to_string(),
                        reason: "minimum host version is not a string",
                    }),
                });
                match parsed {
                    Ok((v, min)) => {
                        versions.insert(v, min);
                    }
                    Err(e) => catalog.reject(&key, Some(version), e.to_string()),
                }
            }

            catalog.addons.insert(
                name,
                AddonInfo {
                    description: info.description,
                    versions,
                },
            );
        }

        Ok(catalog)
    }

    fn reject(&mut self, addon: &str, version: Option<String>, reason: String) {
        self.rejected.push(Rejection {
            addon: addon.to_string(),
            version,
            reason,
        });
    }

    /// Look up an addon by name.
    pub fn get(&self, name: &str) -> Option<&AddonInfo> {
        self.addons.get(name)
    }

    /// Whether the document had an entry for `name` that was dropped as a
    /// whole, as opposed to not mentioning `name` at all.
    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected
            .iter()
            .any(|r| r.addon == name && r.version.is_none())
    }

    /// Whether the catalog lists `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.addons.contains_key(name)
    }

    /// Download URL for one artifact:
    /// `<baseURL>/<name>/releases/download/<version>/<name>-<version>.<ext>`.
    pub fn download_url(&self, name: &str, version: &str, extension: &str) -> String {
        format!(
            "{}/{name}/releases/download/{version}/{name}-{version}.{extension}",
            self.base_url.trim_end_matches('/')
        )
    }
}
