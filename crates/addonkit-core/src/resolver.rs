//! Version selection against the host version.

use std::collections::BTreeMap;

use addonkit_schema::{AddonInfo, Version};

/// Pick the newest addon version whose minimum host version is met by `host`.
///
/// When two keys have equal precedence (`1.0` and `1.0.0`), the one whose raw
/// string sorts last wins, so the result never depends on map iteration order.
pub fn best_compatible_version<'a>(
    versions: &'a BTreeMap<Version, Version>,
    host: &Version,
) -> Option<&'a Version> {
    versions
        .iter()
        .filter(|(_, min_host)| host.satisfies(min_host))
        .map(|(version, _)| version)
        .max()
}

/// Whether `installed` is still listed verbatim for this addon and still runs on `host`.
pub fn is_installed_compatible(info: &AddonInfo, installed: &str, host: &Version) -> bool {
    info.min_host_version(installed)
        .is_some_and(|min_host| host.satisfies(min_host))
}
