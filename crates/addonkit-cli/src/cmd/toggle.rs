//! Enable and disable commands

use addonkit_core::{Reporter, update_state};
use addonkit_schema::AddonName;
use anyhow::{Context, Result};

use crate::GlobalArgs;
use crate::context;
use crate::ui::Output;

/// Flip `enabled` for each name, then optionally run a pass.
///
/// Names not seen in the catalog yet are recorded anyway. The next pass
/// disables them again if the catalog does not list them.
pub async fn toggle(global: &GlobalArgs, names: &[String], enabled: bool, sync: bool) -> Result<()> {
    let names = names
        .iter()
        .map(|n| AddonName::new(n).with_context(|| format!("Invalid addon name '{n}'")))
        .collect::<Result<Vec<_>>>()?;

    let output = Output::new(global.quiet);
    let store = context::store(global)?;

    // (name, known before, changed)
    let mut outcomes = Vec::with_capacity(names.len());
    update_state(&store, |state| {
        for name in names {
            let known = state.get(&name).is_some();
            let changed = state.get(&name).is_none_or(|e| e.enabled != enabled);
            state.set_enabled(name.clone(), enabled);
            outcomes.push((name, known, changed));
        }
    })
    .await
    .context("Failed to update desired state")?;

    let verb = if enabled { "Enabled" } else { "Disabled" };
    for (name, known, changed) in outcomes {
        if !known {
            output.warning(&format!("{name} is not in the catalog yet"));
        }
        if changed {
            output.success(&format!("{verb} {name}"));
        } else {
            output.info(&format!("{name} is already {}", verb.to_lowercase()));
        }
    }

    if sync {
        crate::cmd::sync::sync(global, None).await?;
    }
    Ok(())
}
