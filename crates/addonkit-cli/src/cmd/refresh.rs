//! Refresh command: fetch the catalog without touching installed addons

use std::sync::Arc;

use addonkit_core::Reporter;
use anyhow::{Context, Result};

use crate::GlobalArgs;
use crate::context;
use crate::ui::Output;

pub async fn refresh(global: &GlobalArgs) -> Result<()> {
    let output = Arc::new(Output::new(global.quiet));
    let engine = context::engine(global, output.clone())?;

    let outcome = engine
        .fetch_catalog_only()
        .await
        .context("Failed to refresh the catalog")?;

    output.success(&format!(
        "Catalog lists {} addons ({} new)",
        outcome.catalog.addons.len(),
        outcome.report.added.len()
    ));
    Ok(())
}
