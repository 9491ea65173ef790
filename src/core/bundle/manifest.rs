// ─── Bundle Manifest ───
// Per-bundle `manifest.json` describing identity, launch method and window
// sizing. Read fresh on every launch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

pub const MANIFEST_FILE: &str = "manifest.json";

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;
pub const DEFAULT_MIN_WIDTH: u32 = 800;
pub const DEFAULT_MIN_HEIGHT: u32 = 600;
pub const DEFAULT_HTML_ENTRY: &str = "index.html";

/// Entry-point extensions accepted for native executables.
const NATIVE_EXTENSIONS: &[&str] = &["exe", "bin", "x86_64", "x86", "appimage", "sh"];

/// Declared platform of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformKind {
    Web,
    NativeExecutable,
    /// Anything else, kept verbatim for error messages.
    Other(String),
}

impl PlatformKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "web" | "html" => PlatformKind::Web,
            "exe" | "native" | "nativeexecutable" | "native_executable" => {
                PlatformKind::NativeExecutable
            }
            _ => PlatformKind::Other(raw.to_string()),
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::Web => write!(f, "web"),
            PlatformKind::NativeExecutable => write!(f, "nativeExecutable"),
            PlatformKind::Other(raw) => write!(f, "{raw}"),
        }
    }
}

impl<'de> Deserialize<'de> for PlatformKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(PlatformKind::parse(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    #[serde(rename = "bundleID", alias = "bundleId", alias = "gameId", default)]
    pub bundle_id: String,
    #[serde(alias = "gameName", default)]
    pub display_name: Option<String>,
    #[serde(alias = "platform", default)]
    pub platform_kind: Option<PlatformKind>,
    #[serde(default)]
    pub entry_point: Option<String>,
    #[serde(default)]
    pub main_file: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub min_width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub min_height: Option<u32>,
}

/// How a bundle gets started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMethod {
    /// Relative path of the HTML entry file.
    Window { entry: String },
    /// Relative path of the executable.
    Process { entry: String },
}

/// Window geometry derived from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl BundleManifest {
    /// Load `manifest.json` from an install directory.
    pub async fn read(install_dir: &Path) -> LauncherResult<Self> {
        let path = install_dir.join(MANIFEST_FILE);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| manifest_error(&path, e.to_string()))?;
        Self::parse(&raw).map_err(|reason| manifest_error(&path, reason))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let manifest: BundleManifest = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        if manifest.bundle_id.trim().is_empty() {
            return Err("missing required field `bundleID`".into());
        }
        debug!("Parsed manifest for {}", manifest.bundle_id);
        Ok(manifest)
    }

    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.bundle_id)
    }

    fn declared_entry(&self) -> Option<&str> {
        self.entry_point
            .as_deref()
            .or(self.main_file.as_deref())
            .filter(|entry| !entry.trim().is_empty())
    }

    /// Pick the launch method. HTML entry points win over the declared
    /// platform; native launches need a recognised executable extension.
    pub fn launch_method(&self) -> LauncherResult<LaunchMethod> {
        let html_entry = [self.entry_point.as_deref(), self.main_file.as_deref()]
            .into_iter()
            .flatten()
            .any(|entry| has_extension(entry, &["html"]));

        if self.platform_kind == Some(PlatformKind::Web) || html_entry {
            let entry = self.declared_entry().unwrap_or(DEFAULT_HTML_ENTRY).to_string();
            return Ok(LaunchMethod::Window { entry });
        }

        if self.platform_kind == Some(PlatformKind::NativeExecutable) {
            if let Some(entry) = self
                .entry_point
                .as_deref()
                .filter(|entry| has_extension(entry, NATIVE_EXTENSIONS))
            {
                return Ok(LaunchMethod::Process {
                    entry: entry.to_string(),
                });
            }
        }

        Err(LauncherError::UnsupportedPlatform(
            self.platform_kind
                .as_ref()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "undefined".into()),
        ))
    }

    pub fn window_size(&self) -> WindowSize {
        WindowSize {
            width: self.min_width.unwrap_or(DEFAULT_WIDTH),
            height: self.min_height.unwrap_or(DEFAULT_HEIGHT),
            min_width: self.min_width.unwrap_or(DEFAULT_MIN_WIDTH),
            min_height: self.min_height.unwrap_or(DEFAULT_MIN_HEIGHT),
        }
    }
}

fn manifest_error(path: &Path, reason: String) -> LauncherError {
    LauncherError::Manifest {
        path: PathBuf::from(path),
        reason,
    }
}

fn has_extension(entry: &str, allowed: &[&str]) -> bool {
    Path::new(entry)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Accepts numbers and numeric strings; anything else (including zero)
/// falls back to `None`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|n| *n > 0))
}
