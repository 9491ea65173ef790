// ─── Window Host ───
// Capability the launch manager calls into to host HTML bundles. The desktop
// shell provides the real implementation; the core only sees these traits.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::core::bundle::WindowSize;
use crate::core::error::LauncherResult;

/// The only host data a hosted bundle can reach, exposed as
/// `window.etherAPI` before any page script runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostBridge {
    pub user: Option<serde_json::Value>,
    pub token: Option<String>,
}

impl HostBridge {
    /// Script defining the frozen `window.etherAPI` object.
    pub fn init_script(&self) -> String {
        let user = serde_json::to_string(&self.user).unwrap_or_else(|_| "null".into());
        let token = serde_json::to_string(&self.token).unwrap_or_else(|_| "null".into());
        format!(
            "Object.defineProperty(window, 'etherAPI', {{ value: Object.freeze({{ user: {user}, token: {token} }}), writable: false, configurable: false }});"
        )
    }
}

/// Where navigations away from the bundle end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalLinks {
    /// Deny in-window navigation and open the URL in the system browser.
    SystemBrowser,
}

/// Everything a host needs to create one game window.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    /// Unique window label.
    pub label: String,
    pub title: String,
    pub entry_file: PathBuf,
    pub size: WindowSize,
    /// Hosted content never gets host-process capabilities.
    pub isolated: bool,
    pub external_links: ExternalLinks,
    pub bridge: Option<HostBridge>,
}

/// Live window owned by a session.
pub trait WindowHandle: Send + Sync {
    fn is_destroyed(&self) -> bool;
    fn focus(&self) -> LauncherResult<()>;
    fn close(&self) -> LauncherResult<()>;
}

/// A created window plus its close notification.
pub struct OpenedWindow {
    pub handle: Box<dyn WindowHandle>,
    /// Resolves once the window has been closed/destroyed.
    pub closed: oneshot::Receiver<()>,
}

#[async_trait]
pub trait WindowHost: Send + Sync {
    /// Create the window and load `spec.entry_file`.
    async fn open(&self, spec: WindowSpec) -> LauncherResult<OpenedWindow>;
}

/// Host for headless builds: every window request fails.
pub struct NoWindowHost;

#[async_trait]
impl WindowHost for NoWindowHost {
    async fn open(&self, spec: WindowSpec) -> LauncherResult<OpenedWindow> {
        Err(crate::core::error::LauncherError::Window(format!(
            "no window host available to open {:?}",
            spec.entry_file
        )))
    }
}
