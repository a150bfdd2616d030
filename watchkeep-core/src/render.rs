//! Read-only status projection: plain text and XML documents.

use crate::error::{ControlError, Result};
use crate::models::{PortTarget, Service, ServiceInfo, ServiceType};
use crate::registry::Registry;
use crate::runtime::{format_uptime, RunInfo, VERSION};
use crate::status::{describe_status, monitoring_status};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Output format of `/_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFormat {
    #[default]
    Text,
    Xml,
}

impl StatusFormat {
    /// `None` selects the default; unknown values are rejected.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None => Ok(Self::Text),
            Some(v) if v.starts_with("xml") => Ok(Self::Xml),
            Some(v) if v.starts_with("text") => Ok(Self::Text),
            Some(v) => Err(ControlError::InvalidInput(format!("unknown format: {v}"))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Xml => "text/xml",
        }
    }
}

/// Verbosity of `/_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusLevel {
    #[default]
    Full,
    Summary,
}

impl StatusLevel {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None => Ok(Self::Full),
            Some(v) if v.starts_with("summary") => Ok(Self::Summary),
            Some(v) if v.starts_with("full") => Ok(Self::Full),
            Some(v) => Err(ControlError::InvalidInput(format!("unknown level: {v}"))),
        }
    }
}

/// Services to include.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    All,
    One(&'a str),
}

fn time_string(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(t) => t.format("%a, %d %b %Y %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

fn percent(tenths: u32) -> f64 {
    f64::from(tenths) / 10.0
}

fn megabytes(blocks: u64, block_size: u64) -> f64 {
    blocks as f64 * block_size as f64 / 1_048_576.0
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn selected<'r>(registry: &'r Registry, scope: Scope<'_>) -> Result<Vec<&'r Service>> {
    match scope {
        Scope::All => Ok(registry.iter().collect()),
        Scope::One(name) => Ok(vec![registry.find(name)?]),
    }
}

/// Renders the status document. Caller holds the Run lock for the snapshot.
pub fn render_status(
    registry: &Registry,
    run: &RunInfo,
    format: StatusFormat,
    level: StatusLevel,
    scope: Scope<'_>,
    version: u8,
) -> Result<String> {
    match format {
        StatusFormat::Text => render_text(registry, run, level, scope),
        StatusFormat::Xml => {
            let snapshot = StatusSnapshot::capture(registry, run, level, scope, version)?;
            snapshot.to_xml()
        }
    }
}

pub fn render_text(
    registry: &Registry,
    run: &RunInfo,
    level: StatusLevel,
    scope: Scope<'_>,
) -> Result<String> {
    let services = selected(registry, scope)?;
    let mut out = format!(
        "The watchkeep daemon {} uptime: {}\n\n",
        VERSION,
        format_uptime(run.uptime_secs(), " ")
    );
    for service in services {
        match level {
            StatusLevel::Summary => summary_line(&mut out, registry, service),
            StatusLevel::Full => full_block(&mut out, registry, service),
        }
    }
    Ok(out)
}

fn summary_line(out: &mut String, registry: &Registry, s: &Service) {
    let prefix = format!("{} '{}'", s.kind.label(), s.name);
    let _ = writeln!(
        out,
        "{:<35} {}",
        prefix,
        describe_status(s, registry.event_table())
    );
}

macro_rules! field {
    ($out:expr, $key:expr, $($arg:tt)*) => {
        let _ = writeln!($out, "  {:<33} {}", $key, format_args!($($arg)*));
    };
}

fn full_block(out: &mut String, registry: &Registry, s: &Service) {
    let _ = writeln!(out, "{} '{}'", s.kind.label(), s.name);
    field!(out, "status", "{}", describe_status(s, registry.event_table()));
    field!(out, "monitoring status", "{}", monitoring_status(s));

    if s.has_status() {
        if let Some(info) = &s.info {
            detail_fields(out, info);
        }
        for icmp in s.icmp.iter().filter(|_| s.kind == ServiceType::Host) {
            let rt = if icmp.available { icmp.response_secs } else { 0.0 };
            field!(out, "icmp response time", "{:.3}s [{}]", rt, icmp.kind);
        }
        if matches!(s.kind, ServiceType::Host | ServiceType::Process) {
            for port in &s.ports {
                let rt = if port.available { port.response_secs } else { 0.0 };
                match &port.target {
                    PortTarget::Inet { host, port: number } => {
                        field!(
                            out,
                            "port response time",
                            "{:.3}s to {}:{}{} [{} via {}]",
                            rt,
                            host,
                            number,
                            port.request.as_deref().unwrap_or(""),
                            port.protocol,
                            port.transport
                        );
                    }
                    PortTarget::Unix { path } => {
                        field!(
                            out,
                            "unix socket response time",
                            "{:.3}s to {} [{}]",
                            rt,
                            path,
                            port.protocol
                        );
                    }
                }
            }
        }
    }
    field!(out, "data collected", "{}", time_string(s.collected));
    out.push('\n');
}

fn detail_fields(out: &mut String, info: &ServiceInfo) {
    if let Some(stat) = info.stat() {
        field!(out, "permission", "{:o}", stat.mode & 0o7777);
        field!(out, "uid", "{}", stat.uid);
        field!(out, "gid", "{}", stat.gid);
    }
    if let Some(ts) = info.timestamp() {
        field!(out, "timestamp", "{}", time_string(Some(ts)));
    }
    match info {
        ServiceInfo::File(f) => {
            field!(out, "size", "{} B", f.size);
            if let Some(sum) = &f.checksum {
                field!(out, "checksum", "{} ({})", sum.value, sum.algorithm);
            }
        }
        ServiceInfo::Filesystem(fs) => {
            field!(out, "filesystem flags", "{:#x}", fs.flags);
            field!(out, "block size", "{} B", fs.block_size);
            field!(
                out,
                "blocks total",
                "{} [{:.1} MB]",
                fs.blocks,
                megabytes(fs.blocks, fs.block_size)
            );
            field!(
                out,
                "blocks free for non superuser",
                "{} [{:.1} MB] [{:.1}%]",
                fs.blocks_free,
                megabytes(fs.blocks_free, fs.block_size),
                ratio(fs.blocks_free, fs.blocks)
            );
            field!(
                out,
                "blocks free total",
                "{} [{:.1} MB] [{:.1}%]",
                fs.blocks_free_total,
                megabytes(fs.blocks_free_total, fs.block_size),
                ratio(fs.blocks_free_total, fs.blocks)
            );
            if fs.files > 0 {
                field!(out, "inodes total", "{}", fs.files);
                field!(
                    out,
                    "inodes free",
                    "{} [{:.1}%]",
                    fs.files_free,
                    ratio(fs.files_free, fs.files)
                );
            }
        }
        ServiceInfo::Process(p) => {
            field!(out, "pid", "{}", p.pid.max(0));
            field!(out, "parent pid", "{}", p.ppid.max(0));
            field!(out, "uptime", "{}", format_uptime(p.uptime_secs as i64, " "));
            field!(out, "children", "{}", p.children);
            field!(out, "memory kilobytes", "{}", p.mem_kbyte);
            field!(out, "memory kilobytes total", "{}", p.total_mem_kbyte);
            field!(out, "memory percent", "{:.1}%", percent(p.mem_percent));
            field!(out, "memory percent total", "{:.1}%", percent(p.total_mem_percent));
            field!(out, "cpu percent", "{:.1}%", percent(p.cpu_percent));
            field!(out, "cpu percent total", "{:.1}%", percent(p.total_cpu_percent));
        }
        ServiceInfo::System(sys) => {
            field!(
                out,
                "load average",
                "[{:.2}] [{:.2}] [{:.2}]",
                sys.load_avg[0],
                sys.load_avg[1],
                sys.load_avg[2]
            );
            field!(
                out,
                "cpu",
                "{:.1}%us {:.1}%sy {:.1}%wa",
                percent(sys.cpu_user),
                percent(sys.cpu_system),
                percent(sys.cpu_wait)
            );
            field!(
                out,
                "memory usage",
                "{} kB [{:.1}%]",
                sys.mem_kbyte,
                percent(sys.mem_percent)
            );
            field!(
                out,
                "swap usage",
                "{} kB [{:.1}%]",
                sys.swap_kbyte,
                percent(sys.swap_percent)
            );
        }
        ServiceInfo::Program(p) => match p.started {
            Some(started) => {
                field!(out, "last started", "{}", time_string(Some(started)));
                field!(out, "last exit value", "{}", p.exit_status);
            }
            None => {
                let _ = writeln!(out, "  {:<33}", "not yet started");
            }
        },
        ServiceInfo::Directory(_) | ServiceInfo::Fifo(_) => {}
    }
}

/// Consistent point-in-time copy of the registry handed to the XML serializer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "watchkeep")]
pub struct StatusSnapshot {
    #[serde(rename = "@version")]
    pub version: u8,
    pub server: ServerXml,
    #[serde(rename = "service")]
    pub services: Vec<ServiceXml>,
    #[serde(rename = "servicegroups", skip_serializing_if = "Option::is_none")]
    pub groups: Option<GroupsXml>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerXml {
    pub id: String,
    pub version: String,
    pub uptime: i64,
    pub poll: u64,
    pub startdelay: u64,
    pub localhostname: String,
    pub controlfile: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceXml {
    #[serde(rename = "@type")]
    pub kind: u8,
    pub name: String,
    pub status: u32,
    pub status_hint: u32,
    pub monitor: u8,
    pub monitormode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pendingaction: Option<String>,
    pub status_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupsXml {
    #[serde(rename = "servicegroup")]
    pub groups: Vec<GroupXml>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupXml {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "service")]
    pub members: Vec<String>,
}

impl StatusSnapshot {
    /// Copies everything needed out of the registry so serialization can run
    /// after the lock is released.
    pub fn capture(
        registry: &Registry,
        run: &RunInfo,
        level: StatusLevel,
        scope: Scope<'_>,
        version: u8,
    ) -> Result<Self> {
        let services = selected(registry, scope)?
            .into_iter()
            .map(|s| ServiceXml {
                kind: s.kind.code(),
                name: s.name.clone(),
                status: s.error.bits(),
                status_hint: s.error_hint.bits(),
                monitor: s.monitor.code(),
                monitormode: s.mode.label().to_string(),
                pendingaction: s.pending_action.map(|a| a.name().to_string()),
                status_message: describe_status(s, registry.event_table()),
                collected: s.collected.map(|t| t.timestamp()),
                detail: match level {
                    StatusLevel::Full if s.has_status() => {
                        s.info.as_ref().map(|info| {
                            let mut buf = String::new();
                            detail_fields(&mut buf, info);
                            buf.trim_end().to_string()
                        })
                    }
                    _ => None,
                },
            })
            .collect();

        let groups = (version >= 2).then(|| GroupsXml {
            groups: registry
                .groups()
                .iter()
                .map(|g| GroupXml {
                    name: g.name.clone(),
                    members: g.members.clone(),
                })
                .collect(),
        });

        Ok(Self {
            version,
            server: ServerXml {
                id: run.id.clone(),
                version: VERSION.to_string(),
                uptime: run.uptime_secs(),
                poll: run.poll_interval_secs,
                startdelay: run.start_delay_secs,
                localhostname: run.hostname.clone(),
                controlfile: run.control_file.display().to_string(),
            },
            services,
            groups,
        })
    }

    pub fn to_xml(&self) -> Result<String> {
        let body = quick_xml::se::to_string(self).map_err(|e| ControlError::Xml(e.to_string()))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
    }
}
