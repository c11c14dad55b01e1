//! Persistence for the desired state.
//!
//! A missing document reads as the default state. Nothing is written until a
//! caller saves, so a pass that fails early leaves no file behind.

use std::path::{Path, PathBuf};

use addonkit_schema::DesiredState;
use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;

/// Default file name of the desired-state document.
pub const STATE_FILE_NAME: &str = "addons.json";

/// Errors reading or writing the desired state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The document could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document exists but is not valid desired-state JSON.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// Location of the document.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// The state could not be encoded.
    #[error("Failed to serialize desired state: {0}")]
    Serialize(serde_json::Error),
}

/// Loads and saves the desired state as one snapshot.
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// Read the stored snapshot, or `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or decoded.
    async fn read(&self) -> Result<Option<DesiredState>, StoreError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or written.
    async fn save(&self, state: &DesiredState) -> Result<(), StoreError>;

    /// Read the stored snapshot, falling back to the default state.
    ///
    /// # Errors
    ///
    /// Same as [`DesiredStateStore::read`].
    async fn load(&self) -> Result<DesiredState, StoreError> {
        Ok(self.read().await?.unwrap_or_default())
    }
}

/// Load the state, apply `edit`, and save the result.
///
/// This is how settings and enable flags change outside a pass. The snapshot
/// is saved even when `edit` changed nothing, so the document exists afterwards.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded or saved.
pub async fn update_state<F>(
    store: &dyn DesiredStateStore,
    edit: F,
) -> Result<DesiredState, StoreError>
where
    F: FnOnce(&mut DesiredState) + Send,
{
    let mut state = store.load().await?;
    edit(&mut state);
    store.save(&state).await?;
    Ok(state)
}

/// Desired state kept in a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/addons.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE_NAME))
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DesiredStateStore for JsonStateStore {
    async fn read(&self) -> Result<Option<DesiredState>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        DesiredState::from_json(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Write to a temp file, then rename over the old one.
    async fn save(&self, state: &DesiredState) -> Result<(), StoreError> {
        let content = state.to_json_pretty().map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}
