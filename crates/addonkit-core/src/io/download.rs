//! Streaming download with atomic publish.
//!
//! The body is written to a temporary path next to the destination and only
//! renamed into place once the whole transfer has been flushed to disk. A
//! reader of the destination path therefore sees either nothing or a complete
//! file.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Errors raised while downloading.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Request, status or body stream failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing, syncing or renaming the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Bytes written.
    pub size: u64,
    /// Hex SHA-256 of the body. Informational only.
    pub sha256: String,
}

/// Download `url` into `temp`, then rename it onto `dest`.
///
/// `temp` must be on the same filesystem as `dest`. It is removed on failure.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers with an error
/// status, or the file cannot be written or renamed.
pub async fn download_atomic(
    client: &Client,
    url: &str,
    temp: &Path,
    dest: &Path,
) -> Result<Downloaded, DownloadError> {
    let result = match stream_to_file(client, url, temp).await {
        Ok(downloaded) => tokio::fs::rename(temp, dest)
            .await
            .map(|()| downloaded)
            .map_err(DownloadError::from),
        Err(e) => Err(e),
    };

    if result.is_err() {
        tokio::fs::remove_file(temp).await.ok();
    }
    result
}

async fn stream_to_file(client: &Client, url: &str, path: &Path) -> Result<Downloaded, DownloadError> {
    let response = client.get(url).send().await?.error_for_status()?;

    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut size: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        size += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(Downloaded {
        size,
        sha256: hex::encode(hasher.finalize()),
    })
}
