use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use ether_launcher_lib::core::error::{LauncherError, LauncherResult};
use ether_launcher_lib::core::launch::{
    LaunchManager, OpenedWindow, SessionKind, WindowHandle, WindowHost, WindowSpec,
};

/// Window host that records how many windows were opened and lets the
/// test close them from the outside.
#[derive(Default)]
struct RecordingHost {
    opened: AtomicUsize,
    close_senders: Mutex<Vec<oneshot::Sender<()>>>,
    windows: Mutex<Vec<Arc<AtomicBool>>>,
    open_delay: Duration,
}

impl RecordingHost {
    /// Host whose windows take `open_delay` to come up.
    fn slow(open_delay: Duration) -> Self {
        Self {
            open_delay,
            ..Default::default()
        }
    }

    /// Simulate the user closing every window.
    fn close_all(&self) {
        for destroyed in self.windows.lock().unwrap().iter() {
            destroyed.store(true, Ordering::SeqCst);
        }
        for tx in self.close_senders.lock().unwrap().drain(..) {
            let _ = tx.send(());
        }
    }
}

struct RecordedWindow {
    destroyed: Arc<AtomicBool>,
}

impl WindowHandle for RecordedWindow {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
    fn focus(&self) -> LauncherResult<()> {
        Ok(())
    }
    fn close(&self) -> LauncherResult<()> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl WindowHost for RecordingHost {
    async fn open(&self, _spec: WindowSpec) -> LauncherResult<OpenedWindow> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        let (tx, rx) = oneshot::channel();
        self.close_senders.lock().unwrap().push(tx);
        let destroyed = Arc::new(AtomicBool::new(false));
        self.windows.lock().unwrap().push(destroyed.clone());
        Ok(OpenedWindow {
            handle: Box::new(RecordedWindow { destroyed }),
            closed: rx,
        })
    }
}

fn install(base: &Path, folder: &str, manifest: &str) -> PathBuf {
    let dir = base.join("Ether").join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("manifest.json"), manifest).unwrap();
    dir
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn launch_of_missing_bundle_names_the_path() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = LaunchManager::new(Arc::new(RecordingHost::default()));

    let err = manager.launch(tmp.path(), "ghost", None).await.unwrap_err();
    match err {
        LauncherError::NotInstalled(path) => {
            assert_eq!(path, tmp.path().join("Ether").join("ghost"))
        }
        other => panic!("expected not-installed, got {other}"),
    }
}

#[tokio::test]
async fn double_launch_keeps_a_single_session() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = install(
        tmp.path(),
        "web-game",
        r#"{ "bundleID": "com.ether.web", "displayName": "Web Game", "platformKind": "html" }"#,
    );
    std::fs::write(dir.join("index.html"), "<html></html>").unwrap();

    let host = Arc::new(RecordingHost::default());
    let manager = LaunchManager::new(host.clone());

    let first = manager.launch(tmp.path(), "web-game", None).await.unwrap();
    let second = manager.launch(tmp.path(), "web-game", None).await.unwrap();
    assert_eq!(first.bundle_id.as_deref(), Some("com.ether.web"));
    assert_eq!(second.bundle_id, first.bundle_id);
    assert_eq!(host.opened.load(Ordering::SeqCst), 1);

    let sessions = manager.get_active_sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].bundle_id, "com.ether.web");
    assert_eq!(sessions[0].display_name, "Web Game");
    assert_eq!(sessions[0].kind, SessionKind::Window);

    // Closing the window from the host side ends the session.
    host.close_all();
    wait_until(|| !manager.is_running("com.ether.web")).await;
    assert!(manager.get_active_sessions().is_empty());
}

#[tokio::test]
async fn stale_window_session_is_replaced_on_launch() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = install(
        tmp.path(),
        "web-game",
        r#"{ "bundleID": "com.ether.web", "platformKind": "web" }"#,
    );
    std::fs::write(dir.join("index.html"), "").unwrap();

    let host = Arc::new(RecordingHost::default());
    let manager = LaunchManager::new(host.clone());
    manager.launch(tmp.path(), "web-game", None).await.unwrap();

    // Window destroyed but no close event delivered yet.
    host.windows.lock().unwrap()[0].store(true, Ordering::SeqCst);
    assert!(manager.get_active_sessions().is_empty());

    let relaunch = manager.launch(tmp.path(), "web-game", None).await.unwrap();
    assert_eq!(relaunch.message, "Game launched");
    assert_eq!(host.opened.load(Ordering::SeqCst), 2);
}

fn install_web_game(base: &Path) {
    let dir = install(
        base,
        "web-game",
        r#"{ "bundleID": "com.ether.web", "platformKind": "web" }"#,
    );
    std::fs::write(dir.join("index.html"), "").unwrap();
}

#[tokio::test]
async fn closing_during_startup_shuts_the_new_window() {
    let tmp = tempfile::tempdir().unwrap();
    install_web_game(tmp.path());
    let host = Arc::new(RecordingHost::slow(Duration::from_millis(300)));
    let manager = Arc::new(LaunchManager::new(host.clone()));

    let launching = {
        let manager = manager.clone();
        let base = tmp.path().to_path_buf();
        tokio::spawn(async move { manager.launch(&base, "web-game", None).await })
    };

    // The bundle id is reserved while the window is still opening.
    wait_until(|| manager.is_running("com.ether.web")).await;
    assert!(manager.close_session("com.ether.web").success);

    let result = launching.await.unwrap().unwrap();
    assert!(!result.success);
    assert_eq!(result.message, "Game was closed while starting");
    assert_eq!(host.opened.load(Ordering::SeqCst), 1);
    assert!(host.windows.lock().unwrap()[0].load(Ordering::SeqCst));
    assert!(!manager.is_running("com.ether.web"));
    assert!(manager.get_active_sessions().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_launches_open_one_window() {
    let tmp = tempfile::tempdir().unwrap();
    install_web_game(tmp.path());
    let host = Arc::new(RecordingHost::slow(Duration::from_millis(100)));
    let manager = Arc::new(LaunchManager::new(host.clone()));

    let launches: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            let base = tmp.path().to_path_buf();
            tokio::spawn(async move { manager.launch(&base, "web-game", None).await })
        })
        .collect();
    for launch in launches {
        assert!(launch.await.unwrap().unwrap().success);
    }

    assert_eq!(host.opened.load(Ordering::SeqCst), 1);
    assert_eq!(manager.get_active_sessions().len(), 1);
}

#[tokio::test]
async fn close_session_reports_absent_bundles() {
    let manager = LaunchManager::new(Arc::new(RecordingHost::default()));
    let response = manager.close_session("never-started");
    assert!(!response.success);
    assert_eq!(response.message, "Game not running: never-started");
}

#[tokio::test]
async fn missing_native_executable_is_named() {
    let tmp = tempfile::tempdir().unwrap();
    install(
        tmp.path(),
        "native-game",
        r#"{ "bundleID": "com.ether.native", "platformKind": "nativeExecutable", "entryPoint": "game.bin" }"#,
    );
    let manager = LaunchManager::new(Arc::new(RecordingHost::default()));

    let err = manager.launch(tmp.path(), "native-game", None).await.unwrap_err();
    assert!(matches!(err, LauncherError::EntryNotFound(ref name) if name == "game.bin"));
    assert!(err.to_string().contains("game.bin"));
    assert!(manager.get_active_sessions().is_empty());
}

#[tokio::test]
async fn unsupported_platform_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    install(
        tmp.path(),
        "flash-game",
        r#"{ "bundleID": "com.ether.flash", "platformKind": "flash" }"#,
    );
    let manager = LaunchManager::new(Arc::new(RecordingHost::default()));

    let err = manager.launch(tmp.path(), "flash-game", None).await.unwrap_err();
    assert_eq!(err.to_string(), "Unsupported platform kind: flash");
}

#[cfg(unix)]
mod native {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn install_script(base: &Path, body: &str) {
        let dir = install(
            base,
            "native-game",
            r#"{ "bundleID": "com.ether.native", "displayName": "Native", "platformKind": "nativeExecutable", "entryPoint": "game.sh" }"#,
        );
        let script = dir.join("game.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn process_exit_ends_the_session() {
        let tmp = tempfile::tempdir().unwrap();
        install_script(tmp.path(), "sleep 1");
        let manager = LaunchManager::new(Arc::new(RecordingHost::default()));

        let result = manager.launch(tmp.path(), "native-game", None).await.unwrap();
        assert!(result.success);
        let sessions = manager.get_active_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].kind, SessionKind::Process);

        wait_until(|| !manager.is_running("com.ether.native")).await;
    }

    #[tokio::test]
    async fn close_session_kills_the_process() {
        let tmp = tempfile::tempdir().unwrap();
        install_script(tmp.path(), "exec sleep 30");
        let manager = LaunchManager::new(Arc::new(RecordingHost::default()));

        manager.launch(tmp.path(), "native-game", None).await.unwrap();
        let again = manager.launch(tmp.path(), "native-game", None).await.unwrap();
        assert!(again.message.contains("already running"));
        assert_eq!(manager.get_active_sessions().len(), 1);

        assert!(manager.close_session("com.ether.native").success);
        assert!(manager.get_active_sessions().is_empty());
        assert!(!manager.close_session("com.ether.native").success);
    }
}
