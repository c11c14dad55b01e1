//! The locally persisted desired state (`addons.json`).
//!
//! ```json
//! {
//!   "addons": {
//!     "Commands": { "enabled": true, "installedVersion": "2.1.0", "description": "Adds commands" }
//!   },
//!   "settings": { "autoUpgrade": false }
//! }
//! ```
//!
//! The file is meant to be edited by hand, so every field is optional on read.
//! Entries live in a sorted map, which keeps the written JSON stable between
//! passes that change nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::name::AddonName;

/// What the user wants for one addon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredEntry {
    /// Whether the addon should be installed.
    #[serde(default)]
    pub enabled: bool,
    /// Version currently chosen for installation. Kept as written so a
    /// hand-edited value that does not parse can still be reported and replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    /// Description copied from the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Process-wide settings stored next to the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Upgrade enabled addons to the newest compatible version on every pass.
    #[serde(default)]
    pub auto_upgrade: bool,
}

/// The whole desired-state document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Per-addon entries keyed by name.
    #[serde(default)]
    pub addons: BTreeMap<AddonName, DesiredEntry>,
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,
}

impl DesiredState {
    /// Parse the JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid desired-state JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&DesiredEntry> {
        self.addons.get(name)
    }

    /// Enable or disable an addon, creating its entry on first sight.
    pub fn set_enabled(&mut self, name: AddonName, enabled: bool) {
        self.addons.entry(name).or_default().enabled = enabled;
    }

    /// Toggle the auto-upgrade setting.
    pub fn set_auto_upgrade(&mut self, auto_upgrade: bool) {
        self.settings.auto_upgrade = auto_upgrade;
    }

    /// Add a disabled entry for every catalog addon not seen before.
    ///
    /// Existing entries are left alone. Returns the names that were added.
    pub fn merge_new(&mut self, catalog: &Catalog) -> Vec<AddonName> {
        let mut added = Vec::new();
        for (name, info) in &catalog.addons {
            if self.addons.contains_key(name) {
                continue;
            }
            self.addons.insert(
                name.clone(),
                DesiredEntry {
                    enabled: false,
                    installed_version: None,
                    description: info.description.clone(),
                },
            );
            added.push(name.clone());
        }
        added
    }
}
