//! Control file loading: daemon settings, HTTP access and the service list.

use crate::auth::{AccessPolicy, Credential};
use crate::error::{ControlError, Result};
use crate::models::{
    ActionRate, AlertRecipient, CheckEvery, MonitorMode, ProgramSpec, Service, ServiceGroup,
    ServiceType,
};
use crate::registry::Registry;
use crate::runtime::{effective_user, local_hostname, RunInfo};
use crate::status::EventTable;
use chrono::Utc;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use uuid::Uuid;

/// One `services` entry of the control file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ServiceType,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mode: MonitorMode,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub start: Option<ProgramSpec>,
    #[serde(default)]
    pub stop: Option<ProgramSpec>,
    #[serde(default)]
    pub every: CheckEvery,
    #[serde(default)]
    pub action_rates: Vec<ActionRate>,
    #[serde(default)]
    pub alerts: Vec<AlertRecipient>,
}

impl ServiceConfig {
    fn into_service(self) -> Service {
        let mut service = Service::new(self.name, self.kind);
        service.path = self.path;
        service.mode = self.mode;
        service.depends_on = self.depends_on;
        service.start = self.start;
        service.stop = self.stop;
        service.every = self.every;
        service.action_rates = self.action_rates;
        service.alerts = self.alerts;
        service
    }
}

/// Parsed control file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub start_delay_secs: u64,
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_signature")]
    pub signature: bool,
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub groups: Vec<ServiceGroup>,
    #[serde(default)]
    pub alerts: Vec<AlertRecipient>,
    #[serde(default)]
    pub status_table: Option<EventTable>,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_signature() -> bool {
    true
}

impl ControlFile {
    /// Reads and validates a control file.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ControlError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let file = Self::parse(&raw)?;
        info!(services = file.services.len(), "control file loaded");
        Ok(file)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let file: ControlFile = serde_json::from_str(raw)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(ControlError::Config(
                "poll_interval_secs must be positive".into(),
            ));
        }

        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                return Err(ControlError::Config("service without a name".into()));
            }
            if !names.insert(service.name.as_str()) {
                return Err(ControlError::Config(format!(
                    "duplicate service name: {}",
                    service.name
                )));
            }
        }

        for service in &self.services {
            if let Some(dep) = service.depends_on.iter().find(|d| !names.contains(d.as_str())) {
                return Err(ControlError::Config(format!(
                    "service {} depends on unknown service {}",
                    service.name, dep
                )));
            }
            if let CheckEvery::Cron(expr) | CheckEvery::NotInCron(expr) = &service.every {
                validate_cron(expr)?;
            }
            for program in service.start.iter().chain(service.stop.iter()) {
                if program.argv.is_empty() {
                    return Err(ControlError::Config(format!(
                        "empty program for service {}",
                        service.name
                    )));
                }
            }
        }

        let mut users = HashSet::new();
        for cred in &self.credentials {
            if !users.insert(cred.username.as_str()) {
                return Err(ControlError::Config(format!(
                    "duplicate credential for {}",
                    cred.username
                )));
            }
        }
        Ok(())
    }

    /// Builds the registry in declaration order.
    pub fn build_registry(&self) -> Result<Registry> {
        let mut registry = Registry::new(self.status_table.clone().unwrap_or_default());
        for service in &self.services {
            registry.insert(service.clone().into_service())?;
        }
        for group in &self.groups {
            registry.add_group(group.clone());
        }
        Ok(registry)
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.credentials.clone(), self.allow.clone())
    }

    /// Runtime facts for this daemon instance.
    pub fn run_info(&self, control_file: &Path, bind: SocketAddr) -> RunInfo {
        RunInfo {
            id: self
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            hostname: local_hostname(),
            pid: std::process::id(),
            user: effective_user(),
            control_file: control_file.to_path_buf(),
            log_file: self.log_file.clone(),
            pid_file: self.pid_file.clone(),
            state_file: self.state_file.clone(),
            debug: self.debug,
            poll_interval_secs: self.poll_interval_secs,
            start_delay_secs: self.start_delay_secs,
            bind,
            signature: self.signature,
            auth_style: self.access_policy().auth_style().to_string(),
            alerts: self.alerts.clone(),
            started_at: Utc::now(),
        }
    }
}

/// Checks a cron expression (seconds field included).
pub fn validate_cron(expr: &str) -> Result<()> {
    expr.parse::<Schedule>()
        .map(|_| ())
        .map_err(|e| ControlError::Config(format!("invalid cron expression '{expr}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonitorState;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "id": "box-1",
        "poll_interval_secs": 60,
        "credentials": [
            { "username": "admin", "password": "secret" },
            { "username": "guest", "password": "guest", "read_only": true }
        ],
        "services": [
            { "name": "localhost", "type": "system" },
            {
                "name": "nginx",
                "type": "process",
                "path": "/run/nginx.pid",
                "start": { "argv": ["/usr/sbin/nginx"] },
                "stop": { "argv": ["/usr/sbin/nginx", "-s", "stop"], "timeout_secs": 10 },
                "every": { "type": "cron", "value": "0 */5 * * * *" }
            },
            { "name": "web", "type": "host", "path": "example.org", "depends_on": ["nginx"] }
        ],
        "groups": [ { "name": "www", "members": ["nginx", "web"] } ]
    }"#;

    #[test]
    fn loads_services_in_declaration_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchkeep.json");
        fs::write(&path, SAMPLE).unwrap();

        let file = ControlFile::load(&path).unwrap();
        let registry = file.build_registry().unwrap();
        let names: Vec<_> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["localhost", "nginx", "web"]);

        let nginx = registry.find("nginx").unwrap();
        assert_eq!(nginx.monitor, MonitorState::Initializing);
        assert_eq!(nginx.stop.as_ref().unwrap().timeout_secs, 10);
        assert_eq!(nginx.start.as_ref().unwrap().timeout_secs, 30);
        assert_eq!(registry.groups_of("web"), ["www"]);

        let run = file.run_info(&path, "127.0.0.1:2812".parse().unwrap());
        assert_eq!(run.id, "box-1");
        assert_eq!(run.poll_interval_secs, 60);
        assert!(run.signature);
        assert_eq!(run.auth_style, "Basic Authentication");
    }

    #[test]
    fn rejects_duplicate_names() {
        let raw = r#"{ "services": [
            { "name": "a", "type": "file" },
            { "name": "a", "type": "fifo" }
        ] }"#;
        assert!(matches!(
            ControlFile::parse(raw),
            Err(ControlError::Config(_))
        ));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let raw = r#"{ "services": [
            { "name": "a", "type": "file", "depends_on": ["ghost"] }
        ] }"#;
        let err = ControlFile::parse(raw).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_bad_cron() {
        let raw = r#"{ "services": [
            { "name": "a", "type": "program", "every": { "type": "cron", "value": "whenever" } }
        ] }"#;
        assert!(matches!(
            ControlFile::parse(raw),
            Err(ControlError::Config(_))
        ));
        assert!(validate_cron("0 0 8 * * *").is_ok());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ControlFile::load(Path::new("/nonexistent/watchkeep.json")).unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn generated_id_when_absent() {
        let file = ControlFile::parse("{}").unwrap();
        let run = file.run_info(Path::new("x.json"), "0.0.0.0:2812".parse().unwrap());
        assert_eq!(run.id.len(), 32);
        assert_eq!(run.bind_address(), "Any/All");
        assert!(file.build_registry().unwrap().is_empty());
    }
}
