//! Reconciliation of desired state, catalog and artifact directory.
//!
//! One pass:
//!
//! ```text
//! load state ─► fetch catalog ─► list artifact dir ─► merge new names
//!            ─► resolve enabled entries ─► disable orphans ─► save (if changed)
//!            ─► remove / clean / install
//! ```
//!
//! An enabled addon whose catalog entry was present but malformed is held: it
//! keeps its flag, version and artifact until the catalog lists it cleanly again.
//!
//! Per-addon state is never persisted as such. It is derived from the entry,
//! the catalog and the host version each time (see [`classify`]).

use std::sync::Arc;

use addonkit_schema::{
    AddonInfo, AddonName, Catalog, DesiredEntry, DesiredState, Version, VersionError,
};
use thiserror::Error;

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::EngineConfig;
use crate::fetch::{CatalogFetcher, FetchError};
use crate::reporter::Reporter;
use crate::resolver::{best_compatible_version, is_installed_compatible};
use crate::store::{DesiredStateStore, StoreError};

/// Errors that stop a pass, or stop the engine from being built.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configured host version does not parse.
    #[error("Invalid host version: {0}")]
    InvalidHostVersion(#[from] VersionError),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// No catalog source could be used.
    #[error("Addon catalog unavailable: {0}")]
    Fetch(#[from] FetchError),

    /// The desired state could not be loaded or saved.
    #[error("Desired state: {0}")]
    Store(#[from] StoreError),

    /// The artifact directory could not be scanned. No install was attempted.
    #[error("Artifact directory: {0}")]
    Artifacts(#[from] ArtifactError),
}

/// Derived state of one addon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddonState {
    /// No desired-state entry exists yet.
    Unknown,
    /// Entry exists and is disabled.
    Disabled,
    /// Enabled, but no version has been chosen yet.
    EnabledNoVersion,
    /// Enabled and the chosen version runs on this host.
    EnabledCompatible,
    /// Enabled, but the chosen version is unlisted or needs a newer host.
    /// The next pass switches or disables it.
    EnabledIncompatible,
    /// Enabled, but the catalog no longer lists the addon.
    Orphaned,
}

impl std::fmt::Display for AddonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Disabled => "disabled",
            Self::EnabledNoVersion => "pending",
            Self::EnabledCompatible => "enabled",
            Self::EnabledIncompatible => "incompatible",
            Self::Orphaned => "orphaned",
        };
        f.write_str(s)
    }
}

/// Derive the state of one addon from its entry and catalog listing.
#[must_use]
pub fn classify(entry: Option<&DesiredEntry>, info: Option<&AddonInfo>, host: &Version) -> AddonState {
    let Some(entry) = entry else {
        return AddonState::Unknown;
    };
    if !entry.enabled {
        return AddonState::Disabled;
    }
    let Some(info) = info else {
        return AddonState::Orphaned;
    };
    match &entry.installed_version {
        None => AddonState::EnabledNoVersion,
        Some(v) if is_installed_compatible(info, v, host) => AddonState::EnabledCompatible,
        Some(_) => AddonState::EnabledIncompatible,
    }
}

/// Why a pass disabled an addon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    /// No listed version supports the host version.
    Incompatible,
    /// The catalog no longer lists the addon.
    RemovedFromCatalog,
}

/// A change of chosen version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    /// The addon.
    pub name: AddonName,
    /// Previously chosen version, if any.
    pub from: Option<String>,
    /// Newly chosen version.
    pub to: String,
}

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Names merged in from the catalog.
    pub added: Vec<AddonName>,
    /// Chosen-version changes.
    pub switched: Vec<VersionChange>,
    /// Addons flipped to disabled.
    pub disabled: Vec<(AddonName, DisableReason)>,
    /// Artifacts downloaded, as `(name, version)`.
    pub installed: Vec<(AddonName, String)>,
    /// Artifact file names deleted.
    pub removed: Vec<String>,
    /// Per-addon failures that were skipped.
    pub failures: Vec<String>,
    /// Enabled addons left untouched because their catalog entry is malformed.
    pub held: Vec<AddonName>,
}

impl PassReport {
    /// True when the pass changed neither state nor disk.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.switched.is_empty()
            && self.disabled.is_empty()
            && self.installed.is_empty()
            && self.removed.is_empty()
    }
}

/// Everything a pass hands back to the caller.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// The catalog fetched by this pass. Keep it as the last good catalog.
    pub catalog: Catalog,
    /// Desired state as saved at the end of the pass.
    pub state: DesiredState,
    /// What changed.
    pub report: PassReport,
}

/// The reconciliation engine.
///
/// Passes must not overlap: the engine takes no locks, and two passes over the
/// same store and directory at once will race. Hosts that can trigger a pass
/// from several places (timer, reload command) must serialize the calls.
pub struct Engine {
    host_version: Version,
    fetcher: CatalogFetcher,
    artifacts: ArtifactStore,
    store: Arc<dyn DesiredStateStore>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("host_version", &self.host_version)
            .field("fetcher", &self.fetcher)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host version does not parse or the HTTP client
    /// cannot be built.
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn DesiredStateStore>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, EngineError> {
        let host_version = Version::parse(&config.host_version)?;
        let client = config.http_client()?;
        let fetcher = CatalogFetcher::new(
            client.clone(),
            config.primary_url.clone(),
            config.backup_url.clone(),
        );
        let artifacts = ArtifactStore::new(
            config.artifact_dir.clone(),
            config.artifact_extension.clone(),
            client,
        );

        Ok(Self {
            host_version,
            fetcher,
            artifacts,
            store,
            reporter,
        })
    }

    /// The host version addons are checked against.
    pub fn host_version(&self) -> &Version {
        &self.host_version
    }

    /// The artifact directory this engine manages.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Fetch the catalog without touching desired state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fetch`] when every source fails.
    pub async fn fetch_catalog(&self) -> Result<Catalog, EngineError> {
        match self.fetcher.fetch().await {
            Ok(catalog) => {
                for rejection in &catalog.rejected {
                    self.reporter
                        .warning(&format!("Skipping malformed catalog entry {rejection}"));
                }
                Ok(catalog)
            }
            Err(e) => {
                self.reporter
                    .warning(&format!("Failed to load addon catalog: {e}"));
                Err(e.into())
            }
        }
    }

    /// Refresh the catalog and merge newly seen addons into desired state.
    ///
    /// Installed versions and artifacts are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or saved, or no catalog
    /// source works. Nothing is written in that case.
    pub async fn fetch_catalog_only(&self) -> Result<PassOutcome, EngineError> {
        self.reporter.section("Fetching catalog");
        let stored = self.store.read().await?;
        let catalog = self.fetch_catalog().await?;

        let fresh = stored.is_none();
        let loaded = stored.unwrap_or_default();
        let mut state = loaded.clone();
        let report = PassReport {
            added: state.merge_new(&catalog),
            ..PassReport::default()
        };
        self.announce_added(&report.added);

        if fresh || state != loaded {
            self.save(&state).await?;
        }

        Ok(PassOutcome {
            catalog,
            state,
            report,
        })
    }

    /// Run a pass with the stored `autoUpgrade` setting as the upgrade flag.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::reconcile`].
    pub async fn reconcile_with_settings(&self) -> Result<PassOutcome, EngineError> {
        let upgrade = self.store.load().await?.settings.auto_upgrade;
        self.reconcile(upgrade).await
    }

    /// Run one full reconciliation pass.
    ///
    /// Failures that concern a single addon are reported and collected in
    /// [`PassReport::failures`].
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreadable, both catalog sources
    /// fail, the artifact directory cannot be listed, or the save fails. No
    /// artifact has been touched in those cases, and only a failed save can
    /// come after the state was changed.
    #[tracing::instrument(level = "debug", skip(self), fields(host = %self.host_version))]
    pub async fn reconcile(&self, upgrade: bool) -> Result<PassOutcome, EngineError> {
        self.reporter.section("Checking addons");
        let stored = self.store.read().await?;
        let catalog = self.fetch_catalog().await?;
        if let Err(e) = self.artifacts.list_artifacts().await {
            self.reporter
                .error(&format!("Cannot read addon artifact directory: {e}"));
            return Err(e.into());
        }

        let fresh = stored.is_none();
        let loaded = stored.unwrap_or_default();
        let mut state = loaded.clone();
        let mut report = PassReport {
            added: state.merge_new(&catalog),
            ..PassReport::default()
        };
        self.announce_added(&report.added);

        // Artifacts to delete once the new state is saved: (name, prior version).
        let mut removals: Vec<(AddonName, String)> = Vec::new();

        for (name, entry) in &mut state.addons {
            if !entry.enabled {
                continue;
            }
            match catalog.get(name) {
                Some(info) => {
                    self.resolve_entry(name, entry, info, upgrade, &mut report, &mut removals);
                }
                None if catalog.is_rejected(name) => {
                    self.reporter.warning(&format!(
                        "Catalog entry for {name} is malformed. Leaving it as it is."
                    ));
                    report.held.push(name.clone());
                }
                None => {
                    entry.enabled = false;
                    schedule_removal(&mut removals, name, entry.installed_version.as_deref());
                    self.reporter.warning(&format!(
                        "Addon {name} no longer exists in the catalog. Disabling."
                    ));
                    report
                        .disabled
                        .push((name.clone(), DisableReason::RemovedFromCatalog));
                }
            }
        }

        if fresh || state != loaded {
            tracing::debug!("Saving desired state");
            self.save(&state).await?;
        }

        self.reporter.section("Syncing artifacts");
        self.apply_artifacts(&catalog, &state, &removals, &mut report)
            .await?;

        if report.is_noop() {
            self.reporter.info("All addons are up to date");
        }

        Ok(PassOutcome {
            catalog,
            state,
            report,
        })
    }

    async fn save(&self, state: &DesiredState) -> Result<(), EngineError> {
        self.store.save(state).await.map_err(|e| {
            self.reporter
                .error(&format!("Failed to save desired state: {e}"));
            e.into()
        })
    }

    fn announce_added(&self, added: &[AddonName]) {
        for name in added {
            self.reporter
                .info(&format!("New addon available: {name} (disabled)"));
        }
    }

    fn resolve_entry(
        &self,
        name: &AddonName,
        entry: &mut DesiredEntry,
        info: &AddonInfo,
        upgrade: bool,
        report: &mut PassReport,
        removals: &mut Vec<(AddonName, String)>,
    ) {
        let host = &self.host_version;

        let Some(best) = best_compatible_version(&info.versions, host) else {
            entry.enabled = false;
            schedule_removal(removals, name, entry.installed_version.as_deref());
            self.reporter.warning(&format!(
                "Disabled incompatible addon {name}: no version supports host version {host}"
            ));
            report
                .disabled
                .push((name.clone(), DisableReason::Incompatible));
            return;
        };

        let target = match entry.installed_version.as_deref() {
            Some(installed) if !is_installed_compatible(info, installed, host) => {
                self.reporter.warning(&format!(
                    "Current version of {name} ({installed}) is no longer compatible. Updating to {best}"
                ));
                Some(best)
            }
            Some(installed) => {
                let newer = Version::parse(installed).is_ok_and(|cur| best.is_newer_than(&cur));
                if upgrade && newer {
                    self.reporter
                        .info(&format!("Upgrading {name} from {installed} to {best}"));
                    Some(best)
                } else {
                    None
                }
            }
            None => {
                tracing::debug!(addon = %name, version = %best, "Selected version");
                Some(best)
            }
        };

        if let Some(target) = target {
            report.switched.push(VersionChange {
                name: name.clone(),
                from: entry.installed_version.clone(),
                to: target.to_string(),
            });
            entry.installed_version = Some(target.to_string());
        }

        if info.description.is_some() && info.description != entry.description {
            entry.description.clone_from(&info.description);
        }
    }

    async fn apply_artifacts(
        &self,
        catalog: &Catalog,
        state: &DesiredState,
        removals: &[(AddonName, String)],
        report: &mut PassReport,
    ) -> Result<(), EngineError> {
        for (name, version) in removals {
            match self.artifacts.remove(name, version).await {
                Ok(true) => {
                    let file = self.artifacts.expected_file_name(name, version);
                    self.reporter.info(&format!("Removed addon artifact: {file}"));
                    report.removed.push(file);
                }
                Ok(false) => {}
                Err(e) => {
                    self.reporter.error(&e.to_string());
                    report.failures.push(e.to_string());
                }
            }
        }

        let cleanup = match self.artifacts.cleanup(state).await {
            Ok(cleanup) => cleanup,
            Err(e) => {
                self.reporter
                    .error(&format!("Error while cleaning up addon artifacts: {e}"));
                return Err(e.into());
            }
        };
        for file in cleanup.removed {
            self.reporter
                .info(&format!("Removed outdated addon artifact: {file}"));
            report.removed.push(file);
        }
        for e in cleanup.failures {
            self.reporter.error(&e.to_string());
            report.failures.push(e.to_string());
        }

        for (name, entry) in &state.addons {
            let Some(version) = entry.installed_version.as_deref() else {
                continue;
            };
            if !entry.enabled
                || report.held.contains(name)
                || self.artifacts.exists(name, version).await
            {
                continue;
            }

            self.reporter
                .info(&format!("Addon artifact missing: {name}. Downloading..."));
            let url = catalog.download_url(name, version, self.artifacts.extension());
            match self.artifacts.install(name, version, &url).await {
                Ok(_) => {
                    self.reporter
                        .success(&format!("Successfully installed {name} v{version}"));
                    report.installed.push((name.clone(), version.to_string()));
                }
                Err(e) => {
                    self.reporter
                        .warning(&format!("Failed to install {name}: {e}"));
                    report.failures.push(format!("{name}: {e}"));
                }
            }
        }
        Ok(())
    }
}

/// Queue the artifact of `installed` for deletion.
///
/// Only a parseable version is queued: the value comes from a hand-editable
/// file and ends up in a path.
fn schedule_removal(
    removals: &mut Vec<(AddonName, String)>,
    name: &AddonName,
    installed: Option<&str>,
) {
    match installed {
        Some(v) if Version::parse(v).is_ok() => removals.push((name.clone(), v.to_string())),
        Some(v) => tracing::debug!(addon = %name, version = %v, "Not removing artifact of unparseable version"),
        None => {}
    }
}
