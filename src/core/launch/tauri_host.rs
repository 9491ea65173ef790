// ─── Tauri Window Host ───
// Hosts HTML bundles in their own webview windows. Game windows get no IPC
// capability (only the `main` window is listed in the app capabilities), so
// the init-script bridge is all a bundle can see of the launcher.

use std::sync::Mutex;

use async_trait::async_trait;
use tauri::webview::{WebviewWindowBuilder, WebviewUrl};
use tauri::window::Color;
use tauri::{AppHandle, Manager, Url, WindowEvent};
use tauri_plugin_opener::OpenerExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::window::{ExternalLinks, OpenedWindow, WindowHandle, WindowHost, WindowSpec};

pub struct TauriWindowHost {
    app: AppHandle,
}

impl TauriWindowHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

struct TauriWindow {
    app: AppHandle,
    label: String,
}

impl WindowHandle for TauriWindow {
    fn is_destroyed(&self) -> bool {
        self.app.get_webview_window(&self.label).is_none()
    }

    fn focus(&self) -> LauncherResult<()> {
        let window = self
            .app
            .get_webview_window(&self.label)
            .ok_or_else(|| LauncherError::Window(format!("window {} is gone", self.label)))?;
        if window.is_minimized().unwrap_or(false) {
            window.unminimize().map_err(window_error)?;
        }
        window.set_focus().map_err(window_error)
    }

    fn close(&self) -> LauncherResult<()> {
        match self.app.get_webview_window(&self.label) {
            Some(window) => window.close().map_err(window_error),
            None => Ok(()),
        }
    }
}

fn window_error(e: tauri::Error) -> LauncherError {
    LauncherError::Window(e.to_string())
}

fn is_external(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[async_trait]
impl WindowHost for TauriWindowHost {
    async fn open(&self, spec: WindowSpec) -> LauncherResult<OpenedWindow> {
        let url = Url::from_file_path(&spec.entry_file).map_err(|_| {
            LauncherError::Window(format!("invalid entry path {:?}", spec.entry_file))
        })?;
        debug!("Opening {} at {}", spec.label, url);

        let opener = self.app.clone();
        let redirect_external = spec.external_links == ExternalLinks::SystemBrowser;

        let mut builder = WebviewWindowBuilder::new(&self.app, &spec.label, WebviewUrl::External(url))
            .title(&spec.title)
            .inner_size(spec.size.width as f64, spec.size.height as f64)
            .min_inner_size(spec.size.min_width as f64, spec.size.min_height as f64)
            .background_color(Color(0, 0, 0, 255))
            .on_navigation(move |target| {
                if redirect_external && is_external(target) {
                    if let Err(e) = opener.opener().open_url(target.as_str(), None::<&str>) {
                        warn!("Failed to open {} in browser: {}", target, e);
                    }
                    return false;
                }
                true
            });

        if let Some(bridge) = &spec.bridge {
            builder = builder.initialization_script(&bridge.init_script());
        }

        let window = builder.build().map_err(window_error)?;

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        window.on_window_event(move |event| {
            if let WindowEvent::Destroyed = event {
                if let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) {
                    let _ = tx.send(());
                }
            }
        });

        Ok(OpenedWindow {
            handle: Box::new(TauriWindow {
                app: self.app.clone(),
                label: spec.label,
            }),
            closed: rx,
        })
    }
}
