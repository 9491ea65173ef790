use std::path::{Component, Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Every bundle lives under `<base>/Ether/<folder>/`.
pub const NAMESPACE_DIR: &str = "Ether";

/// Downloaded archive, co-located with the extracted bundle until cleanup.
pub const ARCHIVE_NAME: &str = "game.zip";

/// Canonical install directory for a bundle folder.
///
/// The folder name must be one plain path component so a caller cannot
/// point installs or deletes outside the namespace directory.
pub fn install_dir(base: &Path, folder_name: &str) -> LauncherResult<PathBuf> {
    if !is_plain_component(folder_name) {
        return Err(LauncherError::InvalidFolderName(folder_name.to_string()));
    }
    Ok(base.join(NAMESPACE_DIR).join(folder_name))
}

pub fn archive_path(install_dir: &Path) -> PathBuf {
    install_dir.join(ARCHIVE_NAME)
}

fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_dir_is_namespaced() {
        let dir = install_dir(Path::new("/games"), "spludbuster").unwrap();
        assert_eq!(dir, PathBuf::from("/games/Ether/spludbuster"));
        assert_eq!(
            archive_path(&dir),
            PathBuf::from("/games/Ether/spludbuster/game.zip")
        );
    }

    #[test]
    fn rejects_traversal_and_nested_names() {
        for bad in ["", "..", ".", "a/b", "/abs", "../escape"] {
            assert!(
                matches!(
                    install_dir(Path::new("/games"), bad),
                    Err(LauncherError::InvalidFolderName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
