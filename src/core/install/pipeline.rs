// ─── Install Pipeline ───
// download → extract → validate → cleanup, strictly in order, fail-fast.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use super::paths;
use super::progress::ProgressEvent;
use crate::core::archive::{self, DEFAULT_POLL_INTERVAL};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};

/// Immutable description of one install.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub source_url: String,
    pub base_install_path: PathBuf,
    pub bundle_folder_name: String,
    pub item_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub success: bool,
    pub path: PathBuf,
}

pub struct Installer {
    downloader: Arc<Downloader>,
    poll_interval: Duration,
}

impl Installer {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            downloader,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the whole pipeline for `request`.
    pub async fn install<F>(&self, request: &InstallRequest, mut on_progress: F) -> LauncherResult<InstallOutcome>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let game_dir = paths::install_dir(&request.base_install_path, &request.bundle_folder_name)?;
        let zip_path = paths::archive_path(&game_dir);

        let result = async {
            self.downloader
                .download(&request.source_url, &zip_path, &mut on_progress)
                .await?;

            archive::extract_with_progress(&zip_path, &game_dir, self.poll_interval, &mut on_progress)
                .await?;

            validate(&game_dir).await?;
            cleanup(&zip_path).await;

            Ok::<_, LauncherError>(InstallOutcome {
                success: true,
                path: game_dir.clone(),
            })
        }
        .await;

        if let Err(err) = &result {
            error!("Install failed for {}: {}", request.display_name, err);
        }
        result
    }

    pub async fn is_installed(&self, base: &Path, folder_name: &str) -> bool {
        is_installed(base, folder_name).await
    }

    pub async fn uninstall(&self, base: &Path, folder_name: &str) -> LauncherResult<bool> {
        uninstall(base, folder_name).await
    }
}

/// The install directory must exist, be a directory and hold at least one
/// entry besides the downloaded archive.
pub async fn validate(game_dir: &Path) -> LauncherResult<()> {
    let metadata = match tokio::fs::metadata(game_dir).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Validation failed for {:?}: {}", game_dir, e);
            return Err(LauncherError::ValidationFailed(game_dir.to_path_buf()));
        }
    };
    if !metadata.is_dir() {
        return Err(LauncherError::ValidationFailed(game_dir.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(game_dir)
        .await
        .map_err(|e| LauncherError::io(game_dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(game_dir, e))?
    {
        if entry.file_name() != paths::ARCHIVE_NAME {
            info!("Validation passed: {:?}", game_dir);
            return Ok(());
        }
    }

    Err(LauncherError::ValidationFailed(game_dir.to_path_buf()))
}

/// Delete the archive. Failure only logs: the extracted bundle is valid.
pub async fn cleanup(zip_path: &Path) {
    match tokio::fs::remove_file(zip_path).await {
        Ok(()) => info!("Cleaned up ZIP: {:?}", zip_path),
        Err(e) => warn!("Cleanup failed for {:?}: {}", zip_path, e),
    }
}

/// Directory-exists check only; contents are not validated.
pub async fn is_installed(base: &Path, folder_name: &str) -> bool {
    let Ok(game_dir) = paths::install_dir(base, folder_name) else {
        return false;
    };
    tokio::fs::metadata(&game_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Recursive force-delete. Missing directories count as success.
pub async fn uninstall(base: &Path, folder_name: &str) -> LauncherResult<bool> {
    let game_dir = paths::install_dir(base, folder_name)?;
    info!("Uninstalling (deleting) {:?}", game_dir);

    match tokio::fs::remove_dir_all(&game_dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => {
            error!("Uninstall failed for {:?}: {}", game_dir, e);
            Err(LauncherError::io(game_dir, e))
        }
    }
}
