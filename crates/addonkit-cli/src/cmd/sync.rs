//! Sync command: one reconciliation pass

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::GlobalArgs;
use crate::context;
use crate::ui::Output;
use crate::ui::summary::print_pass;

/// Run a pass. `upgrade: None` follows the stored `autoUpgrade` setting.
pub async fn sync(global: &GlobalArgs, upgrade: Option<bool>) -> Result<()> {
    let output = Arc::new(Output::new(global.quiet));
    let engine = context::engine(global, output.clone())?;

    let outcome = match upgrade {
        Some(upgrade) => engine.reconcile(upgrade).await,
        None => engine.reconcile_with_settings().await,
    }
    .context("Sync failed")?;

    print_pass(&output, &outcome.report);
    Ok(())
}
