use axum::extract::{Path, RawQuery, State};
use axum::response::Html;
use tracing::instrument;
use watchkeep_core::models::{MonitorState, PortTarget, ServiceInfo, ServiceType};
use watchkeep_core::runtime::format_uptime;
use watchkeep_core::status::monitoring_status;
use watchkeep_core::{Registry, Service};

use crate::app::middleware::Caller;
use crate::app::params::FormParams;
use crate::app::views::{
    link_name, render, status_span, time_or_dash, Button, Link, Params, Row, ServicePage,
    Shell,
};
use crate::app::{ApiError, AppState};

fn pct(tenths: u32) -> String {
    format!("{:.1}%", f64::from(tenths) / 10.0)
}

fn mb(blocks: u64, block_size: u64) -> String {
    format!("{:.1} MB", blocks as f64 * block_size as f64 / 1_048_576.0)
}

fn info_rows(p: &mut Params, info: &ServiceInfo) {
    if let Some(stat) = info.stat() {
        p.text("Permission", format!("{:o}", stat.mode & 0o7777))
            .text("UID", stat.uid.to_string())
            .text("GID", stat.gid.to_string());
    }
    if let Some(ts) = info.timestamp() {
        p.text("Timestamp", time_or_dash(Some(ts)));
    }
    match info {
        ServiceInfo::File(f) => {
            p.text("Size", format!("{} B", f.size));
            if let Some(sum) = &f.checksum {
                p.text("Checksum", format!("{} ({})", sum.value, sum.algorithm));
            }
        }
        ServiceInfo::Filesystem(fs) => {
            p.text("Filesystem flags", format!("{:#x}", fs.flags))
                .text("Blocks total", format!("{} [{}]", fs.blocks, mb(fs.blocks, fs.block_size)))
                .text(
                    "Blocks free for non superuser",
                    format!("{} [{}]", fs.blocks_free, mb(fs.blocks_free, fs.block_size)),
                )
                .text(
                    "Blocks free total",
                    format!(
                        "{} [{}]",
                        fs.blocks_free_total,
                        mb(fs.blocks_free_total, fs.block_size)
                    ),
                )
                .text("Block size", format!("{} B", fs.block_size));
            if fs.files > 0 {
                p.text("Inodes total", fs.files.to_string())
                    .text("Inodes free", fs.files_free.to_string());
            }
        }
        ServiceInfo::Process(proc) => {
            p.text("Process id", proc.pid.to_string())
                .text("Parent process id", proc.ppid.to_string())
                .text("Process uptime", format_uptime(proc.uptime_secs as i64, " "))
                .text("Children", proc.children.to_string())
                .text("CPU usage", pct(proc.cpu_percent))
                .text("CPU usage total", pct(proc.total_cpu_percent))
                .text(
                    "Memory usage",
                    format!("{} [{} kB]", pct(proc.mem_percent), proc.mem_kbyte),
                )
                .text(
                    "Memory usage total",
                    format!("{} [{} kB]", pct(proc.total_mem_percent), proc.total_mem_kbyte),
                );
        }
        ServiceInfo::System(sys) => {
            p.text(
                "Load average",
                format!(
                    "[{:.2}] [{:.2}] [{:.2}]",
                    sys.load_avg[0], sys.load_avg[1], sys.load_avg[2]
                ),
            )
            .text(
                "CPU usage",
                format!(
                    "{}us {}sy {}wa",
                    pct(sys.cpu_user),
                    pct(sys.cpu_system),
                    pct(sys.cpu_wait)
                ),
            )
            .text(
                "Memory usage",
                format!("{} kB [{}]", sys.mem_kbyte, pct(sys.mem_percent)),
            )
            .text(
                "Swap usage",
                format!("{} kB [{}]", sys.swap_kbyte, pct(sys.swap_percent)),
            );
        }
        ServiceInfo::Program(prog) => match prog.started {
            Some(started) => {
                p.text("Last started", time_or_dash(Some(started)))
                    .text("Last exit value", prog.exit_status.to_string());
            }
            None => {
                p.text("Last started", "Not yet started");
            }
        },
        ServiceInfo::Directory(_) | ServiceInfo::Fifo(_) => {}
    }
}

fn network_rows(p: &mut Params, s: &Service) {
    for icmp in &s.icmp {
        let value = if !s.has_status() {
            "-".to_string()
        } else if icmp.available {
            format!("{:.3}s", icmp.response_secs)
        } else {
            "connection failed".to_string()
        };
        p.text(&format!("ICMP {}", icmp.kind), value);
    }
    for port in &s.ports {
        let target = match &port.target {
            PortTarget::Inet { host, port: number } => format!(
                "{host}:{number}{} [{} via {}]",
                port.request.as_deref().unwrap_or(""),
                port.protocol,
                port.transport
            ),
            PortTarget::Unix { path } => format!("{path} [{}]", port.protocol),
        };
        let value = if !s.has_status() {
            "-".to_string()
        } else if port.available {
            format!("{:.3}s to {target}", port.response_secs)
        } else {
            format!("connection failed to {target}")
        };
        p.text("Port response time", value);
    }
}

fn detail(registry: &Registry, s: &Service, read_only: bool) -> (Vec<Row>, Vec<Button>) {
    let mut p = Params::default();
    p.text("Name", &s.name)
        .text(
            match s.kind {
                ServiceType::Process => "Pid file",
                ServiceType::Host => "Address",
                _ => "Path",
            },
            s.path.as_deref().unwrap_or("-"),
        )
        .status("Status", status_span(s, registry.event_table()));

    let groups = registry.groups_of(&s.name);
    if !groups.is_empty() {
        p.text("Group", groups.join(", "));
    }
    p.text("Monitoring mode", s.mode.label())
        .text("Monitoring status", monitoring_status(s));

    if !s.depends_on.is_empty() {
        p.links(
            "Depends on",
            s.depends_on.iter().map(|d| Link::service(d)).collect(),
        );
    }
    if let Some(start) = &s.start {
        p.text("Start program", start.to_string());
    }
    if let Some(stop) = &s.stop {
        p.text("Stop program", stop.to_string());
    }
    if let Some(every) = s.every.describe() {
        p.text("Check service", every);
    }
    for rate in &s.action_rates {
        p.text(
            "Timeout",
            format!(
                "If restarted {} times within {} cycle(s) then {}",
                rate.count, rate.cycles, rate.action
            ),
        );
    }
    p.text("Data collected", time_or_dash(s.collected));

    if s.has_status() {
        if let Some(info) = &s.info {
            info_rows(&mut p, info);
        }
    }
    network_rows(&mut p, s);

    for alert in &s.alerts {
        let mut value = format!("{} ({})", alert.to, alert.describe_events());
        if alert.reminder > 0 {
            value.push_str(&format!(" reminder every {} cycle(s)", alert.reminder));
        }
        p.text("Alert mail to", value);
    }

    let mut buttons = Vec::new();
    if !read_only {
        let target = format!("/{}", link_name(&s.name));
        if s.start.is_some() {
            buttons.push(Button::new(&target, "start", "Start service"));
        }
        if s.stop.is_some() {
            buttons.push(Button::new(&target, "stop", "Stop service"));
        }
        if s.start.is_some() && s.stop.is_some() {
            buttons.push(Button::new(&target, "restart", "Restart service"));
        }
        if s.monitor == MonitorState::NotMonitored {
            buttons.push(Button::new(&target, "monitor", "Enable monitoring"));
        } else {
            buttons.push(Button::new(&target, "unmonitor", "Disable monitoring"));
        }
    }
    (p.finish(), buttons)
}

async fn show(state: &AppState, caller: &Caller, name: &str) -> Result<Html<String>, ApiError> {
    let read_only = state.policy.is_read_only(&caller.0);
    let page = {
        let registry = state.registry.lock().await;
        let service = registry.find(name)?;
        let (rows, buttons) = detail(&registry, service, read_only);
        ServicePage {
            shell: Shell::new(&state.run, service.name.clone()),
            heading: format!("{} status", service.kind.label()),
            rows,
            buttons,
        }
    };
    render(&page)
}

#[instrument(skip_all, fields(service = %name))]
pub async fn service_page(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
) -> Result<Html<String>, ApiError> {
    show(&state, &caller, &name).await
}

/// Queues `action` for the service, then renders its page.
#[instrument(skip_all, fields(service = %name))]
pub async fn service_action(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
    body: String,
) -> Result<Html<String>, ApiError> {
    let params = FormParams::parse(query.as_deref(), &body);
    if let Some(action) = params.get("action") {
        state.policy.require_write(&caller.0)?;
        state
            .registry
            .request_action(&name, action, params.get("token"))
            .await?;
    }
    show(&state, &caller, &name).await
}
