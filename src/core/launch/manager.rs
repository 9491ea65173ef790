// ─── Launch Manager ───
// Resolves a bundle's launch method and supervises the resulting window or
// process. One session per bundle id; termination events release it.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::bundle::{BundleManifest, LaunchMethod};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::paths;
use crate::core::registry::{AlreadyHeld, GuardToken, KeyedGuard};

use super::process::{self, SpawnedProcess};
use super::session::{Session, SessionHandle, SessionSummary};
use super::window::{ExternalLinks, HostBridge, OpenedWindow, WindowHost, WindowSpec};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResult {
    pub success: bool,
    pub message: String,
    #[serde(rename = "gameId", skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseSessionResponse {
    pub success: bool,
    pub message: String,
}

enum Started {
    Window(OpenedWindow),
    Process(SpawnedProcess),
}

pub struct LaunchManager {
    window_host: Arc<dyn WindowHost>,
    sessions: Arc<KeyedGuard<Session>>,
}

impl LaunchManager {
    pub fn new(window_host: Arc<dyn WindowHost>) -> Self {
        Self {
            window_host,
            sessions: Arc::new(KeyedGuard::new()),
        }
    }

    /// Launch the bundle installed under `<base>/Ether/<folder>`.
    ///
    /// Re-launching a bundle that is already running focuses it and
    /// succeeds without creating a second session.
    pub async fn launch(
        &self,
        base_install_path: &Path,
        bundle_folder_name: &str,
        bridge: Option<HostBridge>,
    ) -> LauncherResult<LaunchResult> {
        let install_dir = paths::install_dir(base_install_path, bundle_folder_name)?;
        if !tokio::fs::try_exists(&install_dir).await.unwrap_or(false) {
            return Err(LauncherError::NotInstalled(install_dir));
        }

        let manifest = BundleManifest::read(&install_dir).await?;
        let bundle_id = manifest.bundle_id.clone();
        info!("Launching {} ({})", manifest.display_name(), bundle_id);

        let method = manifest.launch_method()?;

        let token = match self.sessions.acquire_unless_live(
            &bundle_id,
            Session::starting(manifest.clone()),
            Session::is_live,
        ) {
            Ok(token) => token,
            Err(AlreadyHeld) => {
                self.focus(&bundle_id);
                return Ok(LaunchResult {
                    success: true,
                    message: "Game already running, focus restored".into(),
                    bundle_id: Some(bundle_id),
                });
            }
        };

        let started = match method {
            LaunchMethod::Window { entry } => self
                .open_window(&install_dir, &manifest, &entry, bridge)
                .await
                .map(Started::Window),
            LaunchMethod::Process { entry } => {
                spawn_process(&install_dir, &entry).map(Started::Process)
            }
        };

        let started = match started {
            Ok(started) => started,
            Err(e) => {
                self.sessions.release(&token);
                return Err(e);
            }
        };

        if !self.attach(token, started) {
            return Ok(LaunchResult {
                success: false,
                message: "Game was closed while starting".into(),
                bundle_id: Some(bundle_id),
            });
        }

        Ok(LaunchResult {
            success: true,
            message: "Game launched".into(),
            bundle_id: Some(bundle_id),
        })
    }

    async fn open_window(
        &self,
        install_dir: &Path,
        manifest: &BundleManifest,
        entry: &str,
        bridge: Option<HostBridge>,
    ) -> LauncherResult<OpenedWindow> {
        let entry_file = resolve_entry(install_dir, entry).await?;
        let spec = WindowSpec {
            label: format!("game-{}", Uuid::new_v4().simple()),
            title: manifest.display_name().to_string(),
            entry_file,
            size: manifest.window_size(),
            isolated: true,
            external_links: ExternalLinks::SystemBrowser,
            bridge,
        };
        self.window_host.open(spec).await
    }

    /// Move the started handle into the reserved session and subscribe to
    /// its termination. Returns false if the reservation was closed in the
    /// meantime, in which case the handle is shut down.
    fn attach(&self, token: GuardToken, started: Started) -> bool {
        let sessions = Arc::clone(&self.sessions);
        match started {
            Started::Window(OpenedWindow { handle, closed }) => {
                let mut pending = Some(handle);
                let attached = self.sessions.update(&token, |session| {
                    if let Some(handle) = pending.take() {
                        session.handle = SessionHandle::Window(Arc::from(handle));
                    }
                });
                if let Some(handle) = pending {
                    if let Err(e) = handle.close() {
                        warn!("Failed to close orphaned window: {}", e);
                    }
                    return false;
                }

                tokio::spawn(async move {
                    let _ = closed.await;
                    if sessions.release(&token).is_some() {
                        info!("Game window closed: {}", token.key());
                    }
                });
                attached
            }
            Started::Process(SpawnedProcess { handle, exited }) => {
                let mut pending = Some(handle);
                let attached = self.sessions.update(&token, |session| {
                    if let Some(handle) = pending.take() {
                        session.handle = SessionHandle::Process(handle);
                    }
                });
                if let Some(mut handle) = pending {
                    handle.kill();
                }

                tokio::spawn(async move {
                    match exited.await {
                        Ok(Some(status)) => {
                            info!("Game {} exited with code {:?}", token.key(), status.code())
                        }
                        _ => warn!("Game {} exited with unknown status", token.key()),
                    }
                    sessions.release(&token);
                });
                attached
            }
        }
    }

    /// The window is called outside the registry lock.
    fn focus(&self, bundle_id: &str) {
        let window = self
            .sessions
            .with(bundle_id, |session| match &session.handle {
                SessionHandle::Window(window) => Some(Arc::clone(window)),
                SessionHandle::Starting | SessionHandle::Process(_) => None,
            })
            .flatten();

        if let Some(Err(e)) = window.map(|window| window.focus()) {
            warn!("Failed to focus {}: {}", bundle_id, e);
        }
    }

    pub fn get_active_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.snapshot(|_, session| session.summary())
    }

    pub fn is_running(&self, bundle_id: &str) -> bool {
        self.sessions
            .with(bundle_id, |session| session.is_live())
            .unwrap_or(false)
    }

    /// Close a window gracefully or kill a process, then drop the session.
    pub fn close_session(&self, bundle_id: &str) -> CloseSessionResponse {
        let live = self
            .sessions
            .remove(bundle_id)
            .filter(|session| session.is_live());

        let Some(session) = live else {
            return CloseSessionResponse {
                success: false,
                message: LauncherError::NotRunning(bundle_id.to_string()).to_string(),
            };
        };

        match session.handle {
            SessionHandle::Window(window) => {
                if let Err(e) = window.close() {
                    warn!("Failed to close window for {}: {}", bundle_id, e);
                }
            }
            SessionHandle::Process(mut process) => {
                process.kill();
            }
            SessionHandle::Starting => {}
        }

        info!("Closed game {}", bundle_id);
        CloseSessionResponse {
            success: true,
            message: "Game closed".into(),
        }
    }
}

fn spawn_process(install_dir: &Path, entry: &str) -> LauncherResult<SpawnedProcess> {
    let executable = install_dir.join(entry);
    if !stays_inside(entry) || !executable.is_file() {
        return Err(LauncherError::EntryNotFound(entry.to_string()));
    }
    process::spawn_detached(&executable, install_dir)
}

async fn resolve_entry(install_dir: &Path, entry: &str) -> LauncherResult<PathBuf> {
    let path = install_dir.join(entry);
    if !stays_inside(entry) || !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(LauncherError::EntryNotFound(entry.to_string()));
    }
    Ok(path)
}

fn stays_inside(entry: &str) -> bool {
    Path::new(entry)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
