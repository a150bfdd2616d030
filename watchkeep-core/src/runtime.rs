//! Daemon runtime parameters shown by `/_runtime`, plus pid file helpers.

use crate::error::Result;
use crate::models::AlertRecipient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, System};
use tracing::{info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Immutable facts about the running daemon.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub id: String,
    pub hostname: String,
    pub pid: u32,
    pub user: String,
    pub control_file: PathBuf,
    pub log_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub debug: bool,
    pub poll_interval_secs: u64,
    pub start_delay_secs: u64,
    pub bind: SocketAddr,
    pub signature: bool,
    pub auth_style: String,
    pub alerts: Vec<AlertRecipient>,
    pub started_at: DateTime<Utc>,
}

impl RunInfo {
    pub fn logging(&self) -> bool {
        self.log_file.is_some()
    }

    /// Seconds since the daemon started.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Bind address text; unspecified addresses read as "Any/All".
    pub fn bind_address(&self) -> String {
        if self.bind.ip().is_unspecified() {
            "Any/All".to_string()
        } else {
            self.bind.ip().to_string()
        }
    }
}

/// Local host name, falling back to "localhost".
pub fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

pub fn effective_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// `"<d>d,<sep><h>h,<sep><m>m"`; days and hours only appear once non-zero.
pub fn format_uptime(secs: i64, sep: &str) -> String {
    if secs < 0 {
        return String::new();
    }
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}d,{sep}"));
    }
    if hours > 0 || days > 0 {
        out.push_str(&format!("{hours}h,{sep}"));
    }
    out.push_str(&format!("{minutes}m"));
    out
}

/// Writes the current pid to `path`.
pub fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", std::process::id()))?;
    info!(pid_file = %path.display(), "pid file written");
    Ok(())
}

pub fn remove_pid_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(pid_file = %path.display(), error = %e, "failed to remove pid file");
    }
}

/// Pid recorded in `path` when that process is alive.
pub fn daemon_pid(path: &Path) -> Option<u32> {
    let pid: u32 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
    let mut system = System::new();
    system.refresh_process(Pid::from_u32(pid)).then_some(pid)
}
