//! Default locations under the addonkit home directory.

use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the addonkit home directory, or None if the user's home cannot be resolved.
///
/// `ADDONKIT_HOME` overrides the default of `~/.addonkit`.
pub fn try_addonkit_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("ADDONKIT_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".addonkit"))
}

/// Desired-state file: `<home>/addons.json`
pub fn state_path(home: &Path) -> PathBuf {
    home.join(crate::store::STATE_FILE_NAME)
}

/// Default artifact directory: `<home>/addons`
pub fn artifact_dir(home: &Path) -> PathBuf {
    home.join("addons")
}
