use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::archive::DEFAULT_POLL_INTERVAL;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::APP_USER_AGENT;
use crate::core::install::{InstallObserver, InstallService, Installer};
use crate::core::launch::{LaunchManager, WindowHost};

const APP_DIR_NAME: &str = "EtherLauncher";
const SETTINGS_FILE: &str = "launcher_settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Used when a caller passes an empty base install path.
    pub default_install_dir: Option<PathBuf>,
    pub extract_poll_interval_ms: u64,
    pub user_agent: String,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            default_install_dir: None,
            extract_poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            user_agent: APP_USER_AGENT.to_string(),
        }
    }
}

impl LauncherSettings {
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.extract_poll_interval_ms.max(1))
    }
}

/// Launcher-wide services. The install and launch services synchronise
/// internally, so callers clone the `Arc`s out instead of holding the
/// outer lock across long operations.
pub struct AppState {
    pub data_dir: PathBuf,
    pub launcher_settings: LauncherSettings,
    pub installs: Arc<InstallService>,
    pub launcher: Arc<LaunchManager>,
}

impl AppState {
    /// Build state rooted at `data_dir`. HTTP and extraction settings are
    /// read once here; later edits apply on the next start.
    pub fn new(
        data_dir: PathBuf,
        window_host: Arc<dyn WindowHost>,
        observer: Arc<dyn InstallObserver>,
    ) -> LauncherResult<Self> {
        let launcher_settings = load_settings_from_disk(&data_dir).unwrap_or_default();
        debug!("Launcher settings: {:?}", launcher_settings);

        let downloader = Arc::new(Downloader::new(&launcher_settings.user_agent)?);
        let installer =
            Arc::new(Installer::new(downloader).with_poll_interval(launcher_settings.poll_interval()));

        Ok(Self {
            data_dir,
            launcher_settings,
            installs: Arc::new(InstallService::new(installer, observer)),
            launcher: Arc::new(LaunchManager::new(window_host)),
        })
    }

    /// Where bundles go when the caller does not name a base path.
    pub fn library_dir(&self) -> PathBuf {
        self.launcher_settings
            .default_install_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("library"))
    }

    pub fn resolve_base_path(&self, raw: &str) -> PathBuf {
        if raw.trim().is_empty() {
            self.library_dir()
        } else {
            PathBuf::from(raw)
        }
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| LauncherError::io(&self.data_dir, e))?;
        let path = self.data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(&self.launcher_settings)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(path, e))
    }
}

fn load_settings_from_disk(data_dir: &Path) -> Option<LauncherSettings> {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring unreadable settings {:?}: {}", path, e);
            None
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME);

    if !dir.exists() {
        let _ = std::fs::create_dir_all(&dir);
    }

    dir
}
