use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::bundle::BundleManifest;

use super::process::ProcessHandle;
use super::window::WindowHandle;

/// What a session owns. `Starting` reserves the bundle id while the window
/// or process is being created.
pub enum SessionHandle {
    Starting,
    Window(Arc<dyn WindowHandle>),
    Process(ProcessHandle),
}

/// One running bundle. The process handle is owned here; the window handle
/// is only lent out to focus it.
pub struct Session {
    pub manifest: BundleManifest,
    pub start_time: DateTime<Utc>,
    pub handle: SessionHandle,
}

impl Session {
    pub fn starting(manifest: BundleManifest) -> Self {
        Self {
            manifest,
            start_time: Utc::now(),
            handle: SessionHandle::Starting,
        }
    }

    /// A window session whose window is already gone counts as absent.
    pub fn is_live(&self) -> bool {
        match &self.handle {
            SessionHandle::Window(window) => !window.is_destroyed(),
            SessionHandle::Starting | SessionHandle::Process(_) => true,
        }
    }

    pub fn kind(&self) -> Option<SessionKind> {
        match self.handle {
            SessionHandle::Starting => None,
            SessionHandle::Window(_) => Some(SessionKind::Window),
            SessionHandle::Process(_) => Some(SessionKind::Process),
        }
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        if !self.is_live() {
            return None;
        }
        Some(SessionSummary {
            bundle_id: self.manifest.bundle_id.clone(),
            display_name: self.manifest.display_name().to_string(),
            start_time: self.start_time,
            kind: self.kind()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Window,
    Process,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(rename = "gameId")]
    pub bundle_id: String,
    #[serde(rename = "gameName")]
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SessionKind,
}
