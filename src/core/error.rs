use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Transfer ────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Transfer of {url} interrupted: {reason}")]
    TransferInterrupted { url: String, reason: String },

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Extraction failed for {path:?}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    // ── Install ─────────────────────────────────────────
    #[error("Installation validation failed: {0:?} is missing or empty")]
    ValidationFailed(PathBuf),

    #[error("Installation already in progress for this game")]
    AlreadyInProgress(String),

    #[error("Invalid game folder name: {0:?}")]
    InvalidFolderName(String),

    #[error("Game is not installed in: {0:?}")]
    NotInstalled(PathBuf),

    // ── Manifest ────────────────────────────────────────
    #[error("Unable to read manifest.json at {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Launch ──────────────────────────────────────────
    #[error("Unsupported platform kind: {0}")]
    UnsupportedPlatform(String),

    /// Missing HTML entry file or native executable, named relative to the
    /// install directory.
    #[error("Entry file not found: {0}")]
    EntryNotFound(String),

    #[error("Window host error: {0}")]
    Window(String),

    #[error("Failed to spawn {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Game not running: {0}")]
    NotRunning(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
