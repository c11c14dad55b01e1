//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// File extension used for artifacts unless configured otherwise.
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "jar";

/// Whole-request timeout for catalog fetches and downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the engine needs to know about its environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Version of the host application, e.g. `1.7.1`.
    pub host_version: String,
    /// Catalog URL tried first.
    pub primary_url: String,
    /// Catalog URL tried when the primary fails.
    pub backup_url: Option<String>,
    /// Directory holding artifact files.
    pub artifact_dir: PathBuf,
    /// Artifact file extension, without the dot.
    pub artifact_extension: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl EngineConfig {
    /// Configuration with the default extension and timeouts and no backup source.
    pub fn new(
        host_version: impl Into<String>,
        primary_url: impl Into<String>,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host_version: host_version.into(),
            primary_url: primary_url.into(),
            backup_url: None,
            artifact_dir: artifact_dir.into(),
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Add a catalog source tried after the primary one.
    pub fn with_backup_url(mut self, url: impl Into<String>) -> Self {
        self.backup_url = Some(url.into());
        self
    }

    /// Set the artifact extension. A leading dot is dropped.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Set the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the HTTP client shared by the fetcher and the artifact store.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
    }
}
