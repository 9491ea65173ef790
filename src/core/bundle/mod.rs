pub mod manifest;

pub use manifest::{BundleManifest, LaunchMethod, PlatformKind, WindowSize, MANIFEST_FILE};
