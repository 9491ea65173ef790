use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use zip::write::SimpleFileOptions;

use ether_launcher_lib::core::downloader::Downloader;
use ether_launcher_lib::core::install::{
    InstallEvent, InstallRequest, InstallService, InstallStatus, Installer, ProgressPhase,
};

const ARCHIVE_SIZE: usize = 10 * 1024 * 1024;

/// A stored (uncompressed) zip of roughly `ARCHIVE_SIZE` bytes.
fn build_archive() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    writer.start_file("manifest.json", options).unwrap();
    writer
        .write_all(br#"{ "bundleID": "com.ether.big", "platformKind": "web" }"#)
        .unwrap();

    writer.add_directory("assets/", options).unwrap();
    let chunk: Vec<u8> = (0..ARCHIVE_SIZE / 4).map(|i| (i % 251) as u8).collect();
    for i in 0..4 {
        writer.start_file(format!("assets/blob{i}.bin"), options).unwrap();
        writer.write_all(&chunk).unwrap();
    }
    writer.start_file("index.html", options).unwrap();
    writer.write_all(b"<html></html>").unwrap();

    writer.finish().unwrap().into_inner()
}

async fn serve_archive(archive: Vec<u8>) -> SocketAddr {
    let archive = Arc::new(archive);
    let app = Router::new().route(
        "/game.zip",
        get(move || {
            let archive = archive.clone();
            async move { archive.as_ref().clone() }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn service() -> (InstallService, mpsc::UnboundedReceiver<InstallEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let installer = Installer::new(Arc::new(Downloader::default()))
        .with_poll_interval(Duration::from_millis(5));
    (InstallService::new(Arc::new(installer), Arc::new(tx)), rx)
}

fn request(addr: SocketAddr, base: &Path, path: &str) -> InstallRequest {
    InstallRequest {
        source_url: format!("http://{addr}{path}"),
        base_install_path: base.to_path_buf(),
        bundle_folder_name: "big-game".into(),
        item_id: "item-42".into(),
        display_name: "Big Game".into(),
    }
}

/// Collect events until the install resolves.
async fn drain(rx: &mut mpsc::UnboundedReceiver<InstallEvent>) -> Vec<InstallEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("install did not resolve in time")
            .expect("observer channel closed");
        let done = !matches!(event, InstallEvent::Progress { .. });
        events.push(event);
        if done {
            return events;
        }
    }
}

#[tokio::test]
async fn ten_megabyte_install_reports_ordered_progress() {
    let addr = serve_archive(build_archive()).await;
    let tmp = tempfile::tempdir().unwrap();
    let (service, mut rx) = service();

    assert!(!service.is_installed(tmp.path(), "big-game").await);
    let accepted = service.start_install(request(addr, tmp.path(), "/game.zip"));
    assert!(accepted.accepted);
    assert_eq!(accepted.message, "Installation started");

    let events = drain(&mut rx).await;

    let mut download = Vec::new();
    let mut extract = Vec::new();
    for event in &events {
        if let InstallEvent::Progress {
            item_id, progress, ..
        } = event
        {
            assert_eq!(item_id, "item-42");
            match progress.phase {
                ProgressPhase::Download => {
                    assert!(extract.is_empty(), "download tick after extraction began");
                    download.push(progress.percent);
                }
                ProgressPhase::Extract => extract.push(progress.percent),
            }
        }
    }

    assert_eq!(download.first(), Some(&0));
    assert_eq!(download.last(), Some(&100));
    assert!(download.windows(2).all(|w| w[0] < w[1]), "{download:?}");
    assert!(!extract.is_empty());
    assert_eq!(extract.last(), Some(&100));
    assert!(extract[..extract.len() - 1].iter().all(|p| *p <= 99));

    let install_dir = tmp.path().join("Ether").join("big-game");
    match events.last().unwrap() {
        InstallEvent::Complete { path, .. } => assert_eq!(path, &install_dir),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(service.is_installed(tmp.path(), "big-game").await);
    assert!(install_dir.join("index.html").is_file());
    assert!(!install_dir.join("game.zip").exists());
    assert_eq!(service.status("item-42").status, InstallStatus::Idle);
}

#[tokio::test]
async fn duplicate_install_is_rejected_until_first_resolves() {
    let addr = serve_archive(build_archive()).await;
    let tmp = tempfile::tempdir().unwrap();
    let (service, mut rx) = service();

    assert!(service.start_install(request(addr, tmp.path(), "/game.zip")).accepted);
    let duplicate = service.start_install(request(addr, tmp.path(), "/game.zip"));
    assert!(!duplicate.accepted);
    assert!(duplicate.message.contains("already in progress"));

    let status = service.status("item-42");
    assert_eq!(status.status, InstallStatus::Installing);
    assert_eq!(status.display_name.as_deref(), Some("Big Game"));

    drain(&mut rx).await;
    assert!(service.start_install(request(addr, tmp.path(), "/game.zip")).accepted);
    drain(&mut rx).await;
}

#[tokio::test]
async fn failed_install_reports_error_and_frees_item() {
    let addr = serve_archive(build_archive()).await;
    let tmp = tempfile::tempdir().unwrap();
    let (service, mut rx) = service();

    assert!(service.start_install(request(addr, tmp.path(), "/missing.zip")).accepted);
    let events = drain(&mut rx).await;
    match events.last().unwrap() {
        InstallEvent::Error { error, .. } => assert!(error.contains("404"), "{error}"),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(!tmp.path().join("Ether/big-game/index.html").exists());
    assert_eq!(service.status("item-42").status, InstallStatus::Idle);
    // The install directory is created before the request, and a failed
    // install leaves it behind; `is_installed` only checks the directory.
    assert!(service.is_installed(tmp.path(), "big-game").await);

    assert!(service.start_install(request(addr, tmp.path(), "/game.zip")).accepted);
    drain(&mut rx).await;
}

#[tokio::test]
async fn cancel_only_forgets_bookkeeping() {
    let addr = serve_archive(build_archive()).await;
    let tmp = tempfile::tempdir().unwrap();
    let (service, mut rx) = service();

    assert!(service.start_install(request(addr, tmp.path(), "/game.zip")).accepted);
    assert!(service.cancel("item-42").success);
    assert_eq!(service.status("item-42").status, InstallStatus::Idle);

    let unknown = service.cancel("item-42");
    assert!(!unknown.success);
    assert_eq!(unknown.error.as_deref(), Some("No active installation"));

    // The pipeline still runs to completion in the background.
    let events = drain(&mut rx).await;
    assert!(matches!(events.last(), Some(InstallEvent::Complete { .. })));
}

#[tokio::test]
async fn uninstall_is_idempotent() {
    let addr = serve_archive(build_archive()).await;
    let tmp = tempfile::tempdir().unwrap();
    let (service, mut rx) = service();

    assert!(service.uninstall(tmp.path(), "big-game").await.unwrap());

    service.start_install(request(addr, tmp.path(), "/game.zip"));
    drain(&mut rx).await;
    assert!(service.is_installed(tmp.path(), "big-game").await);

    assert!(service.uninstall(tmp.path(), "big-game").await.unwrap());
    assert!(!service.is_installed(tmp.path(), "big-game").await);
    assert!(service.uninstall(tmp.path(), "big-game").await.unwrap());
}
