//! Builds stores and engines from the global CLI options.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use addonkit_core::{Engine, EngineConfig, JsonStateStore, Reporter};
use anyhow::{Context, Result};

use crate::GlobalArgs;

fn home() -> Result<PathBuf> {
    crate::try_addonkit_home()
        .context("Could not determine home directory. Set ADDONKIT_HOME to override.")
}

pub fn state_path(args: &GlobalArgs) -> Result<PathBuf> {
    match &args.state {
        Some(path) => Ok(path.clone()),
        None => Ok(addonkit_core::paths::state_path(&home()?)),
    }
}

pub fn artifact_dir(args: &GlobalArgs) -> Result<PathBuf> {
    match &args.dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(addonkit_core::paths::artifact_dir(&home()?)),
    }
}

pub fn store(args: &GlobalArgs) -> Result<JsonStateStore> {
    Ok(JsonStateStore::new(state_path(args)?))
}

pub fn engine_config(args: &GlobalArgs) -> Result<EngineConfig> {
    let host_version = args
        .host_version
        .clone()
        .context("Host version unknown. Pass --host-version or set ADDONKIT_HOST_VERSION.")?;
    let registry_url = args
        .registry_url
        .clone()
        .context("Catalog URL unknown. Pass --registry-url or set ADDONKIT_REGISTRY_URL.")?;

    let mut config = EngineConfig::new(host_version, registry_url, artifact_dir(args)?)
        .with_extension(args.extension.clone())
        .with_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(backup) = &args.backup_url {
        config = config.with_backup_url(backup.clone());
    }
    Ok(config)
}

pub fn engine(args: &GlobalArgs, reporter: Arc<dyn Reporter>) -> Result<Engine> {
    let config = engine_config(args)?;
    let store = Arc::new(store(args)?);
    Engine::new(&config, store, reporter).context("Failed to set up the addon engine")
}
