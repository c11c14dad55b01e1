//! List command

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use addonkit_core::artifacts::artifact_file_name;
use addonkit_core::{DesiredStateStore, Reporter, classify};
use addonkit_schema::{Catalog, DesiredState, Version};
use anyhow::{Context, Result};

use crate::GlobalArgs;
use crate::context;
use crate::ui::Output;
use crate::ui::list::{AddonRow, ArtifactStatus, RowState, print_list};

/// List known addons. Fetches the catalog unless `offline`.
pub async fn list(global: &GlobalArgs, offline: bool) -> Result<()> {
    let output = Arc::new(Output::new(global.quiet));
    let store = context::store(global)?;
    let state = store.load().await.context("Failed to load desired state")?;

    let catalog = if offline {
        None
    } else {
        let engine = context::engine(global, output.clone())?;
        match engine.fetch_catalog().await {
            Ok(catalog) => Some((catalog, engine.host_version().clone())),
            Err(_) => {
                output.info("Showing stored state only");
                None
            }
        }
    };

    let dir = context::artifact_dir(global)?;
    let rows = build_rows(&state, catalog.as_ref(), &dir, &global.extension);

    if rows.is_empty() {
        println!();
        println!("  No addons known yet.");
        println!("  Run 'addonkit refresh' to fetch the catalog.");
        return Ok(());
    }

    print_list(&rows);
    Ok(())
}

fn build_rows(
    state: &DesiredState,
    catalog: Option<&(Catalog, Version)>,
    dir: &Path,
    extension: &str,
) -> Vec<AddonRow> {
    let mut names: BTreeSet<&str> = state.addons.keys().map(|n| n.as_str()).collect();
    if let Some((catalog, _)) = catalog {
        names.extend(catalog.addons.keys().map(|n| n.as_str()));
    }

    names
        .into_iter()
        .map(|name| {
            let entry = state.get(name);
            let info = catalog.and_then(|(c, _)| c.get(name));

            let row_state = match catalog {
                Some((_, host)) => RowState::Derived(classify(entry, info, host)),
                None => RowState::Stored {
                    enabled: entry.is_some_and(|e| e.enabled),
                },
            };

            let version = entry.and_then(|e| e.installed_version.clone());
            let artifact = match (entry, &version) {
                (Some(e), Some(v)) if e.enabled => {
                    artifact_status(&dir.join(artifact_file_name(name, v, extension)))
                }
                _ => ArtifactStatus::NotExpected,
            };

            let description = info
                .and_then(|i| i.description.clone())
                .or_else(|| entry.and_then(|e| e.description.clone()));

            AddonRow {
                name: name.to_string(),
                state: row_state,
                version,
                artifact,
                description,
            }
        })
        .collect()
}

fn artifact_status(path: &Path) -> ArtifactStatus {
    match std::fs::metadata(path) {
        Ok(meta) => ArtifactStatus::Present {
            modified: meta.modified().ok().map(chrono::DateTime::from),
        },
        Err(_) => ArtifactStatus::Missing,
    }
}
