use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tauri::Emitter;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::core::error::LauncherError;
use crate::core::install::{
    CancelInstallResponse, InstallEvent, InstallObserver, InstallRequest, InstallStatusResponse,
    StartInstallResponse,
};
use crate::core::launch::{CloseSessionResponse, HostBridge, LaunchResult, SessionSummary};
use crate::core::state::AppState;

type SharedState<'a> = tauri::State<'a, Arc<Mutex<AppState>>>;

const PROGRESS_EVENT: &str = "installation:progress";
const COMPLETE_EVENT: &str = "installation:complete";
const ERROR_EVENT: &str = "installation:error";

impl InstallObserver for tauri::AppHandle {
    fn notify(&self, event: InstallEvent) {
        let name = match &event {
            InstallEvent::Progress { .. } => PROGRESS_EVENT,
            InstallEvent::Complete { .. } => COMPLETE_EVENT,
            InstallEvent::Error { .. } => ERROR_EVENT,
        };
        if let Err(e) = self.emit(name, &event) {
            error!("Failed to emit {} for {}: {}", name, event.item_id(), e);
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInstallPayload {
    #[serde(alias = "zipUrl")]
    pub source_url: String,
    #[serde(alias = "installPath", default)]
    pub base_install_path: String,
    #[serde(alias = "gameFolderName")]
    pub bundle_folder_name: String,
    #[serde(alias = "gameId")]
    pub item_id: String,
    #[serde(alias = "gameName")]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleLocation {
    #[serde(alias = "installPath", default)]
    pub base_install_path: String,
    #[serde(alias = "gameFolderName")]
    pub bundle_folder_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherSettingsPayload {
    pub default_install_dir: Option<String>,
    pub extract_poll_interval_ms: u64,
    pub user_agent: String,
    #[serde(default)]
    pub data_dir: String,
}

impl LauncherSettingsPayload {
    fn from_state(state: &AppState) -> Self {
        let settings = &state.launcher_settings;
        Self {
            default_install_dir: settings
                .default_install_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            extract_poll_interval_ms: settings.extract_poll_interval_ms,
            user_agent: settings.user_agent.clone(),
            data_dir: state.data_dir.to_string_lossy().to_string(),
        }
    }
}

#[tauri::command]
pub async fn start_install(
    state: SharedState<'_>,
    payload: StartInstallPayload,
) -> Result<StartInstallResponse, LauncherError> {
    let state = state.lock().await;
    let request = InstallRequest {
        source_url: payload.source_url,
        base_install_path: state.resolve_base_path(&payload.base_install_path),
        bundle_folder_name: payload.bundle_folder_name,
        item_id: payload.item_id,
        display_name: payload.display_name,
    };
    Ok(state.installs.start_install(request))
}

#[tauri::command]
pub async fn get_install_status(
    state: SharedState<'_>,
    item_id: String,
) -> Result<InstallStatusResponse, LauncherError> {
    let state = state.lock().await;
    Ok(state.installs.status(&item_id))
}

#[tauri::command]
pub async fn cancel_install(
    state: SharedState<'_>,
    item_id: String,
) -> Result<CancelInstallResponse, LauncherError> {
    let state = state.lock().await;
    Ok(state.installs.cancel(&item_id))
}

#[tauri::command]
pub async fn check_installed(
    state: SharedState<'_>,
    location: BundleLocation,
) -> Result<bool, LauncherError> {
    let (installs, base) = {
        let state = state.lock().await;
        (state.installs.clone(), state.resolve_base_path(&location.base_install_path))
    };
    Ok(installs.is_installed(&base, &location.bundle_folder_name).await)
}

#[tauri::command]
pub async fn uninstall_game(
    state: SharedState<'_>,
    location: BundleLocation,
) -> Result<bool, LauncherError> {
    let (installs, base) = {
        let state = state.lock().await;
        (state.installs.clone(), state.resolve_base_path(&location.base_install_path))
    };
    info!("Uninstalling {}", location.bundle_folder_name);
    installs.uninstall(&base, &location.bundle_folder_name).await
}

#[tauri::command]
pub async fn launch_game(
    state: SharedState<'_>,
    location: BundleLocation,
    user_data: Option<HostBridge>,
) -> Result<LaunchResult, LauncherError> {
    let (launcher, base) = {
        let state = state.lock().await;
        (state.launcher.clone(), state.resolve_base_path(&location.base_install_path))
    };
    launcher
        .launch(&base, &location.bundle_folder_name, user_data)
        .await
        .inspect_err(|e| error!("Failed to launch {}: {}", location.bundle_folder_name, e))
}

#[tauri::command]
pub async fn get_active_games(
    state: SharedState<'_>,
) -> Result<Vec<SessionSummary>, LauncherError> {
    let state = state.lock().await;
    Ok(state.launcher.get_active_sessions())
}

#[tauri::command]
pub async fn close_game(
    state: SharedState<'_>,
    bundle_id: String,
) -> Result<CloseSessionResponse, LauncherError> {
    let state = state.lock().await;
    Ok(state.launcher.close_session(&bundle_id))
}

#[tauri::command]
pub async fn get_launcher_settings(
    state: SharedState<'_>,
) -> Result<LauncherSettingsPayload, LauncherError> {
    let state = state.lock().await;
    Ok(LauncherSettingsPayload::from_state(&state))
}

#[tauri::command]
pub async fn update_launcher_settings(
    state: SharedState<'_>,
    payload: LauncherSettingsPayload,
) -> Result<LauncherSettingsPayload, LauncherError> {
    let mut state = state.lock().await;

    state.launcher_settings.default_install_dir = payload
        .default_install_dir
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from);
    state.launcher_settings.extract_poll_interval_ms = payload.extract_poll_interval_ms.max(1);
    state.launcher_settings.user_agent = payload.user_agent;

    state.save_settings()?;
    Ok(LauncherSettingsPayload::from_state(&state))
}
