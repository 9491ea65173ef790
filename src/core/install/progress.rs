// ─── Install Progress ───
// Progress ticks from the transfer/extract phases and the completion/error
// notifications of detached installs.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Download,
    Extract,
}

/// A single progress tick. Download ticks carry transfer statistics;
/// extract ticks only carry `percent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub phase: ProgressPhase,
    #[serde(rename = "progress")]
    pub percent: u8,
    /// Average bytes per second since the first tick.
    pub throughput: f64,
    pub bytes_downloaded: u64,
    pub bytes_total: Option<u64>,
    pub speed: String,
    pub downloaded: String,
    pub total: String,
    pub eta: String,
}

impl ProgressEvent {
    pub fn extract(percent: u8) -> Self {
        Self {
            phase: ProgressPhase::Extract,
            percent: percent.min(100),
            throughput: 0.0,
            bytes_downloaded: 0,
            bytes_total: None,
            speed: String::new(),
            downloaded: String::new(),
            total: String::new(),
            eta: String::new(),
        }
    }
}

/// Per-transfer clock. Starts on the first tick.
#[derive(Debug, Default)]
pub struct TransferStats {
    started_at: Option<Instant>,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, downloaded: u64, total: Option<u64>) -> ProgressEvent {
        let started_at = *self.started_at.get_or_insert_with(Instant::now);
        let elapsed = started_at.elapsed().as_secs_f64();
        download_event(downloaded, total, elapsed)
    }
}

/// Build a download tick from raw counters and elapsed seconds.
pub fn download_event(downloaded: u64, total: Option<u64>, elapsed_secs: f64) -> ProgressEvent {
    let known_total = total.filter(|t| *t > 0);
    let percent = match known_total {
        Some(t) => ((downloaded as f64 / t as f64) * 100.0).round().clamp(0.0, 100.0) as u8,
        None => 0,
    };

    let throughput = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };
    let remaining = known_total.unwrap_or(0).saturating_sub(downloaded);
    let eta_secs = if throughput > 0.0 {
        remaining as f64 / throughput
    } else {
        0.0
    };

    ProgressEvent {
        phase: ProgressPhase::Download,
        percent,
        throughput,
        bytes_downloaded: downloaded,
        bytes_total: total,
        speed: format!("{} MB/s", megabytes(throughput)),
        downloaded: format!("{} MB", megabytes(downloaded as f64)),
        total: format!("{} MB", megabytes(total.unwrap_or(0) as f64)),
        eta: format_eta(eta_secs),
    }
}

fn megabytes(bytes: f64) -> String {
    format!("{:.2}", bytes / 1024.0 / 1024.0)
}

/// `"2m 5s"` above a minute, `"42s"` otherwise.
pub fn format_eta(secs: f64) -> String {
    let secs = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    let (min, sec) = (secs / 60, secs % 60);
    if min > 0 {
        format!("{min}m {sec}s")
    } else {
        format!("{sec}s")
    }
}

/// Notification about a detached install, addressed by item id.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InstallEvent {
    Progress {
        #[serde(rename = "gameId")]
        item_id: String,
        #[serde(rename = "gameName")]
        display_name: String,
        #[serde(flatten)]
        progress: ProgressEvent,
    },
    Complete {
        #[serde(rename = "gameId")]
        item_id: String,
        #[serde(rename = "gameName")]
        display_name: String,
        path: PathBuf,
    },
    Error {
        #[serde(rename = "gameId")]
        item_id: String,
        #[serde(rename = "gameName")]
        display_name: String,
        error: String,
    },
}

impl InstallEvent {
    pub fn item_id(&self) -> &str {
        match self {
            InstallEvent::Progress { item_id, .. }
            | InstallEvent::Complete { item_id, .. }
            | InstallEvent::Error { item_id, .. } => item_id,
        }
    }
}

/// Receiver side of install notifications (the UI layer in production).
pub trait InstallObserver: Send + Sync {
    fn notify(&self, event: InstallEvent);
}

impl InstallObserver for mpsc::UnboundedSender<InstallEvent> {
    fn notify(&self, event: InstallEvent) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Discards every notification.
pub struct NullObserver;

impl InstallObserver for NullObserver {
    fn notify(&self, _event: InstallEvent) {}
}
