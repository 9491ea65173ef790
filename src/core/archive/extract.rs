// ─── Archive Extraction ───
// Unpacks a zip on the blocking pool while the async side polls a shared
// entry counter and reports approximate progress.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::progress::ProgressEvent;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extract `archive` into `dest_dir`, reporting `extract` ticks.
///
/// Ticks are capped at 99% while extraction runs; exactly one 100% tick is
/// emitted after it finishes. Nothing is rolled back on failure.
pub async fn extract_with_progress<F>(
    archive: &Path,
    dest_dir: &Path,
    poll_interval: Duration,
    mut on_progress: F,
) -> LauncherResult<PathBuf>
where
    F: FnMut(ProgressEvent) + Send,
{
    info!("Extracting {:?} to {:?}", archive, dest_dir);

    let total_entries = count_entries(archive).await?;
    let extracted = Arc::new(AtomicU64::new(0));

    let mut job: JoinHandle<LauncherResult<()>> = {
        let archive = archive.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        let extracted = extracted.clone();
        tokio::task::spawn_blocking(move || extract_all(&archive, &dest_dir, &extracted))
    };

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let outcome = loop {
        tokio::select! {
            joined = &mut job => break joined,
            _ = ticker.tick() => {
                let done = extracted.load(Ordering::Relaxed);
                on_progress(ProgressEvent::extract(polled_percent(done, total_entries)));
            }
        }
    };

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!("Extraction error for {:?}: {}", archive, err);
            return Err(err);
        }
        Err(join_err) => {
            return Err(LauncherError::Extraction {
                path: archive.to_path_buf(),
                reason: join_err.to_string(),
            })
        }
    }

    on_progress(ProgressEvent::extract(100));
    info!("Extraction complete: {:?}", dest_dir);
    Ok(dest_dir.to_path_buf())
}

/// Percent of entries written so far, never reaching 100.
fn polled_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (((done as f64 / total as f64) * 100.0).round() as u64).min(99) as u8
}

async fn count_entries(archive: &Path) -> LauncherResult<u64> {
    let path = archive.to_path_buf();
    tokio::task::spawn_blocking(move || -> LauncherResult<u64> {
        let file = File::open(&path).map_err(|e| LauncherError::io(&path, e))?;
        let zip = ZipArchive::new(file)?;
        Ok(zip.len() as u64)
    })
    .await
    .map_err(|e| LauncherError::Extraction {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?
}

/// Overwrites existing files. Entries whose names escape `dest_dir`
/// (Zip Slip) are skipped.
fn extract_all(archive: &Path, dest_dir: &Path, extracted: &AtomicU64) -> LauncherResult<()> {
    let file = File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = ZipArchive::new(file)?;

    std::fs::create_dir_all(dest_dir).map_err(|e| LauncherError::io(dest_dir, e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;

        let Some(safe_rel) = entry.enclosed_name().map(|p| p.to_owned()) else {
            warn!("Skipped unsafe path: {}", entry.name());
            extracted.fetch_add(1, Ordering::Relaxed);
            continue;
        };
        let out_path = dest_dir.join(safe_rel);

        if entry.is_dir() {
            // Directory modes are not restored so later entries can be written.
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
            }
            // A read-only file left by an earlier extraction cannot be truncated.
            if out_path.is_file() {
                std::fs::remove_file(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            }
            let mut out_file =
                File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            std::io::copy(&mut entry, &mut out_file).map_err(|e| LauncherError::io(&out_path, e))?;
            drop(out_file);

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode & 0o777))
                        .map_err(|e| LauncherError::io(&out_path, e))?;
                }
            }
        }

        extracted.fetch_add(1, Ordering::Relaxed);
    }

    debug!("Wrote {} entries into {:?}", zip.len(), dest_dir);
    Ok(())
}
