use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{build_http_client, APP_USER_AGENT};
use crate::core::install::progress::{ProgressEvent, TransferStats};

/// Streams remote archives straight to disk.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(user_agent: &str) -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client(user_agent)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, calling `on_progress` as bytes arrive.
    ///
    /// Creates parent directories as needed. A tick is emitted before the
    /// first chunk and then whenever the rounded percentage moves (every
    /// chunk when the server sends no `Content-Length`). No retry.
    pub async fn download<F>(&self, url: &str, dest: &Path, mut on_progress: F) -> LauncherResult<PathBuf>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        info!("Downloading from {} to {:?}", url, dest);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut stats = TransferStats::new();
        let mut downloaded: u64 = 0;

        let first = stats.tick(0, total);
        let mut last_percent = first.percent;
        on_progress(first);

        // Write inside a block so the handle is closed before we return.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| LauncherError::TransferInterrupted {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(dest, e))?;

                downloaded += chunk.len() as u64;
                let event = stats.tick(downloaded, total);
                if total.is_none() || event.percent != last_percent {
                    last_percent = event.percent;
                    on_progress(event);
                }
            }

            file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
        }

        if let Some(expected) = total {
            if downloaded < expected {
                return Err(LauncherError::TransferInterrupted {
                    url: url.to_string(),
                    reason: format!("received {downloaded} of {expected} bytes"),
                });
            }
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, downloaded);
        info!("Download complete: {:?}", dest);
        Ok(dest.to_path_buf())
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::with_client(
            build_http_client(APP_USER_AGENT).unwrap_or_else(|_| Client::new()),
        )
    }
}
