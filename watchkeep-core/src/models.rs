use crate::error::ControlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

/// Kind of monitored resource. Fixed for the lifetime of a service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Filesystem,
    Directory,
    File,
    Process,
    Host,
    System,
    Fifo,
    Program,
}

impl ServiceType {
    /// Dashboard section order.
    pub const DASHBOARD_ORDER: [ServiceType; 8] = [
        ServiceType::System,
        ServiceType::Process,
        ServiceType::Program,
        ServiceType::Filesystem,
        ServiceType::File,
        ServiceType::Fifo,
        ServiceType::Directory,
        ServiceType::Host,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ServiceType::Filesystem => "Filesystem",
            ServiceType::Directory => "Directory",
            ServiceType::File => "File",
            ServiceType::Process => "Process",
            ServiceType::Host => "Remote Host",
            ServiceType::System => "System",
            ServiceType::Fifo => "Fifo",
            ServiceType::Program => "Program",
        }
    }

    /// Label shown when a monitored service has no failing check.
    pub fn ok_label(self) -> &'static str {
        match self {
            ServiceType::Filesystem
            | ServiceType::Directory
            | ServiceType::File
            | ServiceType::Fifo => "Accessible",
            ServiceType::Process | ServiceType::System => "Running",
            ServiceType::Host => "Online with all services",
            ServiceType::Program => "Status ok",
        }
    }

    /// Numeric type code used by the XML status document.
    pub fn code(self) -> u8 {
        match self {
            ServiceType::Filesystem => 0,
            ServiceType::Directory => 1,
            ServiceType::File => 2,
            ServiceType::Process => 3,
            ServiceType::Host => 4,
            ServiceType::System => 5,
            ServiceType::Fifo => 6,
            ServiceType::Program => 7,
        }
    }
}

/// Monitoring state. Transitions belong to the scheduler and the collector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    NotMonitored,
    #[default]
    Initializing,
    Waiting,
    Monitored,
}

impl MonitorState {
    pub fn label(self) -> &'static str {
        match self {
            MonitorState::NotMonitored => "Not monitored",
            MonitorState::Initializing => "Initializing",
            MonitorState::Waiting => "Waiting",
            MonitorState::Monitored => "Monitored",
        }
    }

    /// Numeric value used by the XML status document.
    pub fn code(self) -> u8 {
        match self {
            MonitorState::NotMonitored => 0,
            MonitorState::Monitored => 1,
            MonitorState::Initializing => 2,
            MonitorState::Waiting => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    #[default]
    Active,
    Passive,
    Manual,
}

impl MonitorMode {
    pub fn label(self) -> &'static str {
        match self {
            MonitorMode::Active => "active",
            MonitorMode::Passive => "passive",
            MonitorMode::Manual => "manual",
        }
    }
}

/// Operator command that can be queued against a service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Stop,
    Restart,
    Monitor,
    Unmonitor,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Start,
        Action::Stop,
        Action::Restart,
        Action::Monitor,
        Action::Unmonitor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Monitor => "monitor",
            Action::Unmonitor => "unmonitor",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = ControlError;

    /// Action names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ControlError::InvalidAction(s.to_string()))
    }
}

/// Check category. Each maps to one bit of [`ErrorFlags`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Action,
    Checksum,
    Connection,
    Content,
    Data,
    Exec,
    Fsflag,
    Gid,
    Icmp,
    Instance,
    Invalid,
    Nonexist,
    Permission,
    Pid,
    PPid,
    Resource,
    Size,
    Status,
    Timeout,
    Timestamp,
    Uid,
}

impl Event {
    pub const ALL: [Event; 21] = [
        Event::Action,
        Event::Checksum,
        Event::Connection,
        Event::Content,
        Event::Data,
        Event::Exec,
        Event::Fsflag,
        Event::Gid,
        Event::Icmp,
        Event::Instance,
        Event::Invalid,
        Event::Nonexist,
        Event::Permission,
        Event::Pid,
        Event::PPid,
        Event::Resource,
        Event::Size,
        Event::Status,
        Event::Timeout,
        Event::Timestamp,
        Event::Uid,
    ];

    pub fn bit(self) -> ErrorFlags {
        ErrorFlags(1 << (self as u32))
    }

    pub fn label(self) -> &'static str {
        match self {
            Event::Action => "Action",
            Event::Checksum => "Checksum",
            Event::Connection => "Connection",
            Event::Content => "Content",
            Event::Data => "Data",
            Event::Exec => "Exec",
            Event::Fsflag => "Fsflags",
            Event::Gid => "Gid",
            Event::Icmp => "Icmp",
            Event::Instance => "Instance",
            Event::Invalid => "Invalid",
            Event::Nonexist => "Nonexist",
            Event::Permission => "Permission",
            Event::Pid => "PID",
            Event::PPid => "PPID",
            Event::Resource => "Resource",
            Event::Size => "Size",
            Event::Status => "Status",
            Event::Timeout => "Timeout",
            Event::Timestamp => "Timestamp",
            Event::Uid => "Uid",
        }
    }
}

/// Set of failing check categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ErrorFlags(u32);

impl ErrorFlags {
    pub const NONE: ErrorFlags = ErrorFlags(0);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, event: Event) -> bool {
        self.0 & event.bit().0 != 0
    }

    pub fn insert(&mut self, event: Event) {
        self.0 |= event.bit().0;
    }

    pub fn remove(&mut self, event: Event) {
        self.0 &= !event.bit().0;
    }
}

impl BitOr<Event> for ErrorFlags {
    type Output = ErrorFlags;

    fn bitor(mut self, rhs: Event) -> ErrorFlags {
        self.insert(rhs);
        self
    }
}

impl BitOrAssign<Event> for ErrorFlags {
    fn bitor_assign(&mut self, rhs: Event) {
        self.insert(rhs);
    }
}

impl FromIterator<Event> for ErrorFlags {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        iter.into_iter().fold(ErrorFlags::NONE, |acc, e| acc | e)
    }
}

/// Program used to start or stop a service.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramSpec {
    pub argv: Vec<String>,
    #[serde(default)]
    pub uid: Option<u32>,
    #[serde(default)]
    pub gid: Option<u32>,
    #[serde(default = "default_program_timeout")]
    pub timeout_secs: u64,
}

fn default_program_timeout() -> u64 {
    30
}

impl fmt::Display for ProgramSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.argv.join(" "))?;
        if let Some(uid) = self.uid {
            write!(f, " as uid {uid}")?;
        }
        if let Some(gid) = self.gid {
            write!(f, " as gid {gid}")?;
        }
        write!(f, " timeout {} second(s)", self.timeout_secs)
    }
}

/// How often a service is checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum CheckEvery {
    #[default]
    Cycle,
    SkipCycles(u32),
    Cron(String),
    NotInCron(String),
}

impl CheckEvery {
    /// Human description, `None` for the default every-cycle schedule.
    pub fn describe(&self) -> Option<String> {
        match self {
            CheckEvery::Cycle => None,
            CheckEvery::SkipCycles(n) => Some(format!("every {n} cycle")),
            CheckEvery::Cron(expr) => Some(format!("every \"{expr}\"")),
            CheckEvery::NotInCron(expr) => Some(format!("not every \"{expr}\"")),
        }
    }
}

/// "If restarted `count` times within `cycles` cycle(s) then `action`".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRate {
    pub count: u32,
    pub cycles: u32,
    pub action: String,
}

/// Alert subscription. `events == None` subscribes to everything.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertRecipient {
    pub to: String,
    #[serde(default)]
    pub events: Option<Vec<Event>>,
    #[serde(default)]
    pub reminder: u32,
}

impl AlertRecipient {
    pub fn describe_events(&self) -> String {
        match &self.events {
            None => "All events".to_string(),
            Some(events) if events.is_empty() => "No events".to_string(),
            Some(events) => events
                .iter()
                .map(|e| e.label())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Ownership and permission bits of a file-like object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FileStat {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FilesystemInfo {
    pub stat: FileStat,
    pub flags: u64,
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_free_total: u64,
    pub files: u64,
    pub files_free: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathInfo {
    pub stat: FileStat,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checksum {
    pub value: String,
    pub algorithm: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub stat: FileStat,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<Checksum>,
}

/// Percent values are stored in tenths of a percent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProcessInfo {
    pub pid: i32,
    pub ppid: i32,
    pub uptime_secs: u64,
    pub children: u32,
    pub mem_kbyte: u64,
    pub total_mem_kbyte: u64,
    pub mem_percent: u32,
    pub total_mem_percent: u32,
    pub cpu_percent: u32,
    pub total_cpu_percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemInfo {
    pub load_avg: [f64; 3],
    pub cpu_user: u32,
    pub cpu_system: u32,
    pub cpu_wait: u32,
    pub mem_kbyte: u64,
    pub mem_percent: u32,
    pub swap_kbyte: u64,
    pub swap_percent: u32,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProgramInfo {
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    pub exit_status: i32,
}

/// Per-type data published by the collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ServiceInfo {
    Filesystem(FilesystemInfo),
    Directory(PathInfo),
    File(FileInfo),
    Fifo(PathInfo),
    Process(ProcessInfo),
    System(SystemInfo),
    Program(ProgramInfo),
}

impl ServiceInfo {
    pub fn kind(&self) -> ServiceType {
        match self {
            ServiceInfo::Filesystem(_) => ServiceType::Filesystem,
            ServiceInfo::Directory(_) => ServiceType::Directory,
            ServiceInfo::File(_) => ServiceType::File,
            ServiceInfo::Fifo(_) => ServiceType::Fifo,
            ServiceInfo::Process(_) => ServiceType::Process,
            ServiceInfo::System(_) => ServiceType::System,
            ServiceInfo::Program(_) => ServiceType::Program,
        }
    }

    pub fn stat(&self) -> Option<FileStat> {
        match self {
            ServiceInfo::Filesystem(fs) => Some(fs.stat),
            ServiceInfo::Directory(p) | ServiceInfo::Fifo(p) => Some(p.stat),
            ServiceInfo::File(f) => Some(f.stat),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ServiceInfo::Directory(p) | ServiceInfo::Fifo(p) => Some(p.timestamp),
            ServiceInfo::File(f) => Some(f.timestamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "family")]
pub enum PortTarget {
    Inet { host: String, port: u16 },
    Unix { path: String },
}

/// Last connection test against a port or unix socket.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortStatus {
    pub target: PortTarget,
    pub protocol: String,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default = "default_transport")]
    pub transport: String,
    pub response_secs: f64,
    pub available: bool,
}

fn default_transport() -> String {
    "TCP".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcmpStatus {
    pub kind: String,
    pub response_secs: f64,
    pub available: bool,
}

/// One monitored unit.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub name: String,
    pub kind: ServiceType,
    pub path: Option<String>,
    pub monitor: MonitorState,
    pub mode: MonitorMode,
    pub error: ErrorFlags,
    pub error_hint: ErrorFlags,
    pub pending_action: Option<Action>,
    pub action_token: Option<String>,
    pub depends_on: Vec<String>,
    pub start: Option<ProgramSpec>,
    pub stop: Option<ProgramSpec>,
    pub every: CheckEvery,
    pub action_rates: Vec<ActionRate>,
    pub alerts: Vec<AlertRecipient>,
    pub info: Option<ServiceInfo>,
    pub ports: Vec<PortStatus>,
    pub icmp: Vec<IcmpStatus>,
    pub collected: Option<DateTime<Utc>>,
}

impl Service {
    /// A fresh, never-collected service.
    pub fn new(name: impl Into<String>, kind: ServiceType) -> Self {
        Self {
            name: name.into(),
            kind,
            path: None,
            monitor: MonitorState::default(),
            mode: MonitorMode::default(),
            error: ErrorFlags::NONE,
            error_hint: ErrorFlags::NONE,
            pending_action: None,
            action_token: None,
            depends_on: Vec::new(),
            start: None,
            stop: None,
            every: CheckEvery::default(),
            action_rates: Vec::new(),
            alerts: Vec::new(),
            info: None,
            ports: Vec::new(),
            icmp: Vec::new(),
            collected: None,
        }
    }

    /// Collected detail is only meaningful while the service is monitored.
    pub fn has_status(&self) -> bool {
        self.monitor == MonitorState::Monitored
    }
}

/// Named set of services; membership is matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parse_is_case_insensitive() {
        assert_eq!("STOP".parse::<Action>().unwrap(), Action::Stop);
        assert_eq!("Unmonitor".parse::<Action>().unwrap(), Action::Unmonitor);
        assert!(matches!(
            "reboot".parse::<Action>(),
            Err(ControlError::InvalidAction(_))
        ));
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn error_flags_track_events() {
        let mut flags: ErrorFlags = [Event::Pid, Event::Size].into_iter().collect();
        assert!(flags.contains(Event::Pid));
        assert!(flags.contains(Event::Size));
        assert!(!flags.contains(Event::Uid));
        flags.remove(Event::Pid);
        assert!(!flags.contains(Event::Pid));
        flags.remove(Event::Size);
        assert!(flags.is_empty());
    }

    #[test]
    fn every_event_has_distinct_bit() {
        let all: ErrorFlags = Event::ALL.into_iter().collect();
        assert_eq!(all.bits().count_ones() as usize, Event::ALL.len());
    }

    #[test]
    fn program_spec_display() {
        let spec = ProgramSpec {
            argv: vec!["/etc/init.d/nginx".into(), "start".into()],
            uid: Some(33),
            gid: None,
            timeout_secs: 60,
        };
        assert_eq!(
            spec.to_string(),
            "'/etc/init.d/nginx start' as uid 33 timeout 60 second(s)"
        );
    }

    #[test]
    fn alert_event_description() {
        let mut r = AlertRecipient {
            to: "ops@example.com".into(),
            events: None,
            reminder: 0,
        };
        assert_eq!(r.describe_events(), "All events");
        r.events = Some(vec![]);
        assert_eq!(r.describe_events(), "No events");
        r.events = Some(vec![Event::Pid, Event::Timeout]);
        assert_eq!(r.describe_events(), "PID Timeout");
    }
}
