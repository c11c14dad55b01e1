//! Catalog retrieval with primary/backup fallback.

use addonkit_schema::{Catalog, CatalogError};
use reqwest::Client;
use thiserror::Error;

/// Errors fetching the catalog.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request, status or body failure for one source.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A source answered with a document that does not decode.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Every source failed. Holds each URL with its failure, in order.
    #[error("All catalog sources failed: {}", summarize(.0))]
    Unavailable(Vec<(String, FetchError)>),
}

fn summarize(attempts: &[(String, FetchError)]) -> String {
    attempts
        .iter()
        .map(|(url, e)| format!("{url} ({e})"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fetches the catalog from an ordered list of sources.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: Client,
    sources: Vec<String>,
}

impl CatalogFetcher {
    /// Fetcher trying `primary`, then `backup` when given.
    pub fn new(client: Client, primary: impl Into<String>, backup: Option<String>) -> Self {
        let mut sources = vec![primary.into()];
        sources.extend(backup);
        Self { client, sources }
    }

    /// Try each source in turn and return the first catalog that decodes.
    ///
    /// A source that answers with a document that does not decode counts as
    /// failed, and the next one is tried.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unavailable`] when no source yields a catalog.
    pub async fn fetch(&self) -> Result<Catalog, FetchError> {
        let mut attempts = Vec::new();
        for url in &self.sources {
            match self.fetch_one(url).await {
                Ok(catalog) => {
                    tracing::debug!(
                        source = %url,
                        addons = catalog.addons.len(),
                        rejected = catalog.rejected.len(),
                        "Catalog loaded"
                    );
                    return Ok(catalog);
                }
                Err(e) => {
                    tracing::warn!(source = %url, "Catalog source failed: {e}");
                    attempts.push((url.clone(), e));
                }
            }
        }

        Err(FetchError::Unavailable(attempts))
    }

    async fn fetch_one(&self, url: &str) -> Result<Catalog, FetchError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(Catalog::from_json(&bytes)?)
    }
}
