//! Settings command

use addonkit_core::{Reporter, update_state};
use anyhow::{Context, Result};

use crate::GlobalArgs;
use crate::context;
use crate::ui::Output;

/// Store the auto-upgrade flag used by `addonkit sync`.
pub async fn auto_upgrade(global: &GlobalArgs, enabled: bool) -> Result<()> {
    let output = Output::new(global.quiet);
    let store = context::store(global)?;

    update_state(&store, |state| state.set_auto_upgrade(enabled))
        .await
        .context("Failed to update desired state")?;

    let word = if enabled { "on" } else { "off" };
    output.success(&format!("Auto-upgrade is {word}"));
    Ok(())
}
