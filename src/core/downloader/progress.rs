use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Payload reported to the observer while a download runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    pub percent: u8,
    pub bytes_downloaded: u64,
    /// `0` when the server did not declare a length.
    pub total_bytes: u64,
    pub speed_bytes_per_sec: u64,
    /// `None` while the remaining time is indeterminate.
    pub eta_seconds: Option<u64>,
}

/// State of a single in-flight download.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub dest_dir: PathBuf,
    pub file_name: String,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl DownloadTask {
    pub fn new(url: &str, dest_dir: &Path, file_name: &str) -> Self {
        Self {
            url: url.to_string(),
            dest_dir: dest_dir.to_path_buf(),
            file_name: file_name.to_string(),
            bytes_transferred: 0,
            total_bytes: 0,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn dest_path(&self) -> PathBuf {
        self.dest_dir.join(&self.file_name)
    }

    pub fn record_chunk(&mut self, len: usize) {
        self.bytes_transferred = self.bytes_transferred.saturating_add(len as u64);
    }

    pub fn progress(&self) -> DownloadProgress {
        compute_progress(
            self.bytes_transferred,
            self.total_bytes,
            self.started.elapsed(),
        )
    }
}

pub fn compute_progress(downloaded: u64, total: u64, elapsed: Duration) -> DownloadProgress {
    let secs = elapsed.as_secs_f64();
    let speed = if secs > 0.0 {
        (downloaded as f64 / secs) as u64
    } else {
        0
    };

    let percent = if total > 0 {
        (downloaded.saturating_mul(100) / total).min(100) as u8
    } else {
        0
    };

    let eta_seconds = if total > 0 && speed > 0 {
        Some(total.saturating_sub(downloaded) / speed)
    } else {
        None
    };

    DownloadProgress {
        percent,
        bytes_downloaded: downloaded,
        total_bytes: total,
        speed_bytes_per_sec: speed,
        eta_seconds,
    }
}

/// Limits how often progress is *reported*; accumulation is never throttled.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

// ── Display helpers for front-ends ──────────────────────

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }
    let value = bytes as f64;
    if value >= GB {
        format!("{:.2} GB", value / GB)
    } else if value >= MB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.0} KB", value / KB)
    }
}

pub fn format_speed(bytes_per_sec: u64) -> String {
    let kbps = bytes_per_sec / 1024;
    if kbps == 0 {
        "0 KB/s".to_string()
    } else if kbps >= 1024 {
        format!("{:.1} MB/s", kbps as f64 / 1024.0)
    } else {
        format!("{kbps} KB/s")
    }
}

pub fn format_eta(eta_seconds: Option<u64>) -> String {
    match eta_seconds {
        Some(secs) => format!("{:02}:{:02}", secs / 60, secs % 60),
        None => "--:--".to_string(),
    }
}
