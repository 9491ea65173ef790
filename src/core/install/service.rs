// ─── Install Service ───
// Caller-facing entry point: accepts or rejects install requests per item id
// and runs accepted pipelines detached.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::pipeline::{InstallRequest, Installer};
use super::progress::{InstallEvent, InstallObserver};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::registry::KeyedGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Installing,
    Idle,
}

/// Registry entry for an install in flight.
#[derive(Debug, Clone, Serialize)]
pub struct InstallRecord {
    #[serde(rename = "gameId")]
    pub item_id: String,
    pub status: InstallStatus,
    #[serde(rename = "gameName")]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartInstallResponse {
    #[serde(rename = "success")]
    pub accepted: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallStatusResponse {
    pub status: InstallStatus,
    #[serde(rename = "gameName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelInstallResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct InstallService {
    installer: Arc<Installer>,
    active: Arc<KeyedGuard<InstallRecord>>,
    observer: Arc<dyn InstallObserver>,
}

impl InstallService {
    pub fn new(installer: Arc<Installer>, observer: Arc<dyn InstallObserver>) -> Self {
        Self {
            installer,
            active: Arc::new(KeyedGuard::new()),
            observer,
        }
    }

    /// Accept `request` unless an install for the same item is in flight.
    ///
    /// Must be called from within a Tokio runtime: the pipeline is spawned
    /// and this returns as soon as the request is registered. Progress,
    /// completion and failure reach the observer.
    pub fn start_install(&self, request: InstallRequest) -> StartInstallResponse {
        info!("Starting installation for {}", request.display_name);

        let record = InstallRecord {
            item_id: request.item_id.clone(),
            status: InstallStatus::Installing,
            display_name: request.display_name.clone(),
        };
        let token = match self.active.acquire(&request.item_id, record) {
            Ok(token) => token,
            Err(_) => {
                let err = LauncherError::AlreadyInProgress(request.item_id.clone());
                warn!("Rejected install for {}: {}", request.item_id, err);
                return StartInstallResponse {
                    accepted: false,
                    message: err.to_string(),
                };
            }
        };

        let installer = self.installer.clone();
        let active = self.active.clone();
        let observer = self.observer.clone();

        tokio::spawn(async move {
            let progress_observer = observer.clone();
            let item_id = request.item_id.clone();
            let display_name = request.display_name.clone();

            let result = installer
                .install(&request, move |progress| {
                    progress_observer.notify(InstallEvent::Progress {
                        item_id: item_id.clone(),
                        display_name: display_name.clone(),
                        progress,
                    })
                })
                .await;

            active.release(&token);

            match result {
                Ok(outcome) => {
                    info!("Installation complete for {}", request.display_name);
                    observer.notify(InstallEvent::Complete {
                        item_id: request.item_id,
                        display_name: request.display_name,
                        path: outcome.path,
                    });
                }
                Err(err) => {
                    error!("Installation failed for {}: {}", request.display_name, err);
                    observer.notify(InstallEvent::Error {
                        item_id: request.item_id,
                        display_name: request.display_name,
                        error: err.to_string(),
                    });
                }
            }
        });

        StartInstallResponse {
            accepted: true,
            message: "Installation started".into(),
        }
    }

    pub fn status(&self, item_id: &str) -> InstallStatusResponse {
        self.active
            .with(item_id, |record| InstallStatusResponse {
                status: record.status,
                display_name: Some(record.display_name.clone()),
            })
            .unwrap_or(InstallStatusResponse {
                status: InstallStatus::Idle,
                display_name: None,
            })
    }

    /// Forget the install record for `item_id`.
    ///
    /// The running transfer/extraction is not interrupted; it finishes (or
    /// fails) in the background and still reports through the observer.
    pub fn cancel(&self, item_id: &str) -> CancelInstallResponse {
        match self.active.remove(item_id) {
            Some(record) => {
                info!("Cancelled install bookkeeping for {}", record.display_name);
                CancelInstallResponse {
                    success: true,
                    error: None,
                }
            }
            None => CancelInstallResponse {
                success: false,
                error: Some("No active installation".into()),
            },
        }
    }

    pub async fn is_installed(&self, base: &Path, folder_name: &str) -> bool {
        self.installer.is_installed(base, folder_name).await
    }

    pub async fn uninstall(&self, base: &Path, folder_name: &str) -> LauncherResult<bool> {
        self.installer.uninstall(base, folder_name).await
    }
}
