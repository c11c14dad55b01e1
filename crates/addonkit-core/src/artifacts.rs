//! On-disk addon artifacts.
//!
//! Layout: `<dir>/<name>-<version>.<ext>`, one file per installed addon.
//! Downloads land in `<dir>/<name>-<version>.<ext>.part` first and are renamed
//! into place when complete.
//!
//! The directory may be shared with files that are not ours. A file is only
//! ever deleted when it parses as `<knownName>-<validVersion>.<ext>` (or the
//! `.part` form of it).

use std::path::{Path, PathBuf};

use addonkit_schema::{AddonName, DesiredState, Version};
use reqwest::Client;
use thiserror::Error;

use crate::io::download::{DownloadError, Downloaded, download_atomic};

/// Suffix appended to in-flight downloads.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Errors installing one artifact.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The download failed or the server answered with an error status.
    #[error("Network failure: {0}")]
    Network(reqwest::Error),

    /// The artifact could not be written.
    #[error("IO failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DownloadError> for InstallError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::Http(e) => Self::Network(e),
            DownloadError::Io(e) => Self::Io(e),
        }
    }
}

/// Errors touching files already in the artifact directory.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// A file could not be deleted.
    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        /// The file.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// The directory could not be listed.
    #[error("Failed to read artifact directory {}: {source}", path.display())]
    ReadDir {
        /// The directory.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
}

/// Result of a cleanup scan.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// File names that were deleted.
    pub removed: Vec<String>,
    /// Deletions that failed. The scan carried on past each of them.
    pub failures: Vec<ArtifactError>,
}

/// `<name>-<version>.<ext>`
pub fn artifact_file_name(name: &str, version: &str, extension: &str) -> String {
    format!("{name}-{version}.{extension}")
}

/// Owns the artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    extension: String,
    client: Client,
}

impl ArtifactStore {
    /// Store over `dir`, naming files with `extension` and downloading with
    /// `client`.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, client: Client) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            client,
        }
    }

    /// The artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Extension of artifact files, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name of the artifact for `name` at `version`.
    pub fn expected_file_name(&self, name: &str, version: &str) -> String {
        artifact_file_name(name, version, &self.extension)
    }

    /// Full path of the artifact for `name` at `version`.
    pub fn path_for(&self, name: &str, version: &str) -> PathBuf {
        self.dir.join(self.expected_file_name(name, version))
    }

    fn partial_path_for(&self, name: &str, version: &str) -> PathBuf {
        self.dir.join(format!(
            "{}{PARTIAL_SUFFIX}",
            self.expected_file_name(name, version)
        ))
    }

    /// Whether the artifact for this exact version is present.
    pub async fn exists(&self, name: &str, version: &str) -> bool {
        tokio::fs::try_exists(self.path_for(name, version))
            .await
            .unwrap_or(false)
    }

    /// Download `url` and publish it as the artifact for `name`/`version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails or the file cannot be written.
    /// No partial artifact is left behind either way.
    pub async fn install(
        &self,
        name: &str,
        version: &str,
        url: &str,
    ) -> Result<Downloaded, InstallError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let dest = self.path_for(name, version);
        let temp = self.partial_path_for(name, version);

        tracing::debug!(addon = %name, %version, %url, "Downloading artifact");
        let downloaded = download_atomic(&self.client, url, &temp, &dest).await?;
        tracing::debug!(
            addon = %name,
            %version,
            size = downloaded.size,
            sha256 = %downloaded.sha256,
            "Artifact published"
        );
        Ok(downloaded)
    }

    /// Delete the artifact for `name`/`version` if it exists.
    ///
    /// Returns whether a file was removed. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Remove`] if the file exists but cannot be deleted.
    pub async fn remove(&self, name: &str, version: &str) -> Result<bool, ArtifactError> {
        remove_if_present(&self.path_for(name, version)).await
    }

    /// File names in the directory that carry the artifact extension.
    ///
    /// Entries whose metadata cannot be read are skipped. A missing directory
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::ReadDir`] if the directory cannot be listed.
    pub async fn list_artifacts(&self) -> Result<Vec<String>, ArtifactError> {
        let suffix = format!(".{}", self.extension);
        Ok(self
            .list_files()
            .await?
            .into_iter()
            .filter(|f| f.ends_with(&suffix))
            .collect())
    }

    async fn list_files(&self) -> Result<Vec<String>, ArtifactError> {
        let read_dir_err = |source| ArtifactError::ReadDir {
            path: self.dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_dir_err(e)),
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(read_dir_err(e)),
            };

            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), "Skipping unreadable entry: {e}");
                    continue;
                }
            }

            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(raw) => tracing::debug!(?raw, "Skipping non UTF-8 file name"),
            }
        }

        files.sort();
        Ok(files)
    }

    /// Which known addon a file belongs to, and at which version.
    ///
    /// The text between `<name>-` and `.<ext>` must parse as a version. When
    /// several names match (`Foo` and `Foo-Bar`), the longest one wins.
    pub fn owner_of<'a>(
        &self,
        file_name: &str,
        names: impl IntoIterator<Item = &'a AddonName>,
    ) -> Option<(&'a AddonName, Version)> {
        let stem = file_name.strip_suffix(&format!(".{}", self.extension))?;

        names
            .into_iter()
            .filter_map(|name| {
                let rest = stem.strip_prefix(name.as_str())?.strip_prefix('-')?;
                Version::parse(rest).ok().map(|v| (name, v))
            })
            .max_by_key(|(name, _)| name.len())
    }

    /// Bring the directory in line with `state`.
    ///
    /// Deletes every artifact of a known addon unless the addon is enabled and
    /// the file is exactly its installed version, plus leftover partial
    /// downloads of known addons. Enabled addons without a chosen version keep
    /// their files. Unknown files are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::ReadDir`] if the directory cannot be listed.
    /// Failed deletions do not stop the scan; they are collected in
    /// [`CleanupReport::failures`].
    pub async fn cleanup(&self, state: &DesiredState) -> Result<CleanupReport, ArtifactError> {
        let mut report = CleanupReport::default();

        for file_name in self.list_files().await? {
            let (candidate, partial) = match file_name.strip_suffix(PARTIAL_SUFFIX) {
                Some(stripped) => (stripped, true),
                None => (file_name.as_str(), false),
            };

            let Some((name, version)) = self.owner_of(candidate, state.addons.keys()) else {
                continue;
            };

            let keep = !partial
                && state.get(name).is_some_and(|entry| {
                    entry.enabled
                        && entry
                            .installed_version
                            .as_deref()
                            .is_none_or(|installed| installed == version.as_str())
                });
            if keep {
                continue;
            }

            match remove_if_present(&self.dir.join(&file_name)).await {
                Ok(true) => {
                    tracing::debug!(addon = %name, %version, file = %file_name, "Removed stale artifact");
                    report.removed.push(file_name);
                }
                Ok(false) => {}
                Err(e) => report.failures.push(e),
            }
        }

        Ok(report)
    }
}

async fn remove_if_present(path: &Path) -> Result<bool, ArtifactError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ArtifactError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
