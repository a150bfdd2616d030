use axum::extract::State;
use axum::response::Html;
use tracing::instrument;
use watchkeep_core::models::{ServiceInfo, ServiceType};
use watchkeep_core::runtime::format_uptime;
use watchkeep_core::{Registry, Service};

use crate::app::views::{
    render, status_span, time_or_dash, DashboardRow, HomePage, Link, Section, Shell, Span,
};
use crate::app::{ApiError, AppState};

fn pct(tenths: u32) -> String {
    format!("{:.1}%", f64::from(tenths) / 10.0)
}

fn used_pct(free: u64, total: u64) -> String {
    if total == 0 {
        return "-".into();
    }
    format!("{:.1}%", 100.0 * (total - free.min(total)) as f64 / total as f64)
}

fn columns(kind: ServiceType) -> &'static [&'static str] {
    match kind {
        ServiceType::System => &["System", "Status", "Load", "CPU", "Memory", "Swap"],
        ServiceType::Process => &["Process", "Status", "Uptime", "CPU Total", "Memory Total"],
        ServiceType::Program => &["Program", "Status", "Last started", "Exit value"],
        ServiceType::Filesystem => &["Filesystem", "Status", "Space usage", "Inodes usage"],
        ServiceType::File => &["File", "Status", "Size", "Permission", "UID", "GID"],
        ServiceType::Fifo => &["Fifo", "Status", "Permission", "UID", "GID"],
        ServiceType::Directory => &["Directory", "Status", "Permission", "UID", "GID"],
        ServiceType::Host => &["Host", "Status", "Protocol(s)"],
    }
}

/// Detail cells for one row; every value is `-` unless the service has status.
fn detail_cells(s: &Service) -> Vec<Vec<Span>> {
    let cell = |text: String| vec![Span::plain(text)];
    let dash = |n: usize| -> Vec<Vec<Span>> { (0..n).map(|_| cell("-".to_string())).collect() };
    let width = columns(s.kind).len() - 2;
    if s.kind == ServiceType::Host {
        if s.ports.is_empty() {
            return vec![cell("-".to_string())];
        }
        let protocols = s
            .ports
            .iter()
            .map(|p| {
                let tone = if !s.has_status() {
                    "gray-text"
                } else if p.available {
                    "green-text"
                } else {
                    "red-text"
                };
                Span::toned(format!("[{}]", p.protocol), tone)
            })
            .collect();
        return vec![protocols];
    }
    if !s.has_status() {
        return dash(width);
    }
    let Some(info) = &s.info else {
        return dash(width);
    };
    let texts = match info {
        ServiceInfo::System(sys) => vec![
            format!(
                "[{:.2}] [{:.2}] [{:.2}]",
                sys.load_avg[0], sys.load_avg[1], sys.load_avg[2]
            ),
            format!(
                "{}us, {}sy, {}wa",
                pct(sys.cpu_user),
                pct(sys.cpu_system),
                pct(sys.cpu_wait)
            ),
            format!("{} [{} kB]", pct(sys.mem_percent), sys.mem_kbyte),
            format!("{} [{} kB]", pct(sys.swap_percent), sys.swap_kbyte),
        ],
        ServiceInfo::Process(p) => vec![
            format_uptime(p.uptime_secs as i64, " "),
            pct(p.total_cpu_percent),
            format!("{} [{} kB]", pct(p.total_mem_percent), p.total_mem_kbyte),
        ],
        ServiceInfo::Program(p) => match p.started {
            Some(started) => vec![time_or_dash(Some(started)), p.exit_status.to_string()],
            None => vec!["Not yet started".into(), "-".into()],
        },
        ServiceInfo::Filesystem(fs) => vec![
            used_pct(fs.blocks_free, fs.blocks),
            if fs.files > 0 {
                used_pct(fs.files_free, fs.files)
            } else {
                "not supported by filesystem".into()
            },
        ],
        ServiceInfo::File(f) => vec![
            format!("{} B", f.size),
            format!("{:o}", f.stat.mode & 0o7777),
            f.stat.uid.to_string(),
            f.stat.gid.to_string(),
        ],
        ServiceInfo::Fifo(p) | ServiceInfo::Directory(p) => vec![
            format!("{:o}", p.stat.mode & 0o7777),
            p.stat.uid.to_string(),
            p.stat.gid.to_string(),
        ],
    };
    texts.into_iter().map(cell).collect()
}

/// Table for one service type; `None` when no service has that type.
fn section(registry: &Registry, kind: ServiceType) -> Option<Section> {
    let rows: Vec<DashboardRow> = registry
        .by_type(kind)
        .map(|s| DashboardRow {
            link: Link::service(&s.name),
            status: status_span(s, registry.event_table()),
            cells: detail_cells(s),
        })
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(Section {
        columns: columns(kind),
        rows,
    })
}

/// Dashboard. The Run lock is held while the sections are collected.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let sections = {
        let registry = state.registry.lock().await;
        ServiceType::DASHBOARD_ORDER
            .into_iter()
            .filter_map(|kind| section(&registry, kind))
            .collect()
    };
    render(&HomePage {
        shell: Shell::new(&state.run, "Home"),
        sections,
    })
}
