//! Status labels: monitoring state, first-failing-check text and pending actions.

use crate::models::{Event, MonitorState, Service};
use serde::{Deserialize, Serialize};

/// One row of the ordered error table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDescription {
    pub event: Event,
    pub failed: String,
    pub changed: String,
}

impl EventDescription {
    fn new(event: Event, failed: &str, changed: &str) -> Self {
        Self {
            event,
            failed: failed.to_string(),
            changed: changed.to_string(),
        }
    }
}

/// Ordered error table consulted top to bottom; the first failing entry wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EventTable(Vec<EventDescription>);

impl Default for EventTable {
    fn default() -> Self {
        use Event::*;
        Self(vec![
            EventDescription::new(Action, "Action done", "Action done"),
            EventDescription::new(Checksum, "Checksum failed", "Checksum changed"),
            EventDescription::new(Connection, "Connection failed", "Connection changed"),
            EventDescription::new(Content, "Content failed", "Content match"),
            EventDescription::new(Data, "Data access error", "Data access changed"),
            EventDescription::new(Exec, "Execution failed", "Execution changed"),
            EventDescription::new(Fsflag, "Filesystem flags failed", "Filesystem flags changed"),
            EventDescription::new(Gid, "GID failed", "GID changed"),
            EventDescription::new(Icmp, "ICMP failed", "ICMP changed"),
            EventDescription::new(Instance, "Monit instance failed", "Monit instance changed"),
            EventDescription::new(Invalid, "Invalid type", "Type changed"),
            EventDescription::new(Nonexist, "Does not exist", "Existence changed"),
            EventDescription::new(Permission, "Permission failed", "Permission changed"),
            EventDescription::new(Pid, "PID failed", "PID changed"),
            EventDescription::new(PPid, "PPID failed", "PPID changed"),
            EventDescription::new(Resource, "Resource limit matched", "Resource limit changed"),
            EventDescription::new(Size, "Size failed", "Size changed"),
            EventDescription::new(Status, "Status failed", "Status changed"),
            EventDescription::new(Timeout, "Timeout", "Timeout changed"),
            EventDescription::new(Timestamp, "Timestamp failed", "Timestamp changed"),
            EventDescription::new(Uid, "UID failed", "UID changed"),
        ])
    }
}

impl EventTable {
    pub fn new(rows: Vec<EventDescription>) -> Self {
        Self(rows)
    }

    pub fn rows(&self) -> &[EventDescription] {
        &self.0
    }

    /// Text for the first row whose event is failing on `service`.
    pub fn first_failure(&self, service: &Service) -> Option<&str> {
        self.0
            .iter()
            .find(|row| service.error.contains(row.event))
            .map(|row| {
                if service.error_hint.contains(row.event) {
                    row.changed.as_str()
                } else {
                    row.failed.as_str()
                }
            })
    }
}

/// Colour class used by HTML views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Inactive,
    Ok,
    Failed,
}

impl StatusTone {
    pub fn css_class(self) -> &'static str {
        match self {
            StatusTone::Inactive => "gray-text",
            StatusTone::Ok => "green-text",
            StatusTone::Failed => "red-text",
        }
    }
}

/// Label for the monitoring state alone.
pub fn monitoring_status(service: &Service) -> &'static str {
    service.monitor.label()
}

/// Status label with precedence
/// not monitored > waiting > initializing > monitored with errors > monitored.
pub fn describe_status(service: &Service, table: &EventTable) -> String {
    let mut label = match service.monitor {
        MonitorState::NotMonitored | MonitorState::Waiting | MonitorState::Initializing => {
            service.monitor.label().to_string()
        }
        MonitorState::Monitored if service.error.is_empty() => service.kind.ok_label().to_string(),
        // an error bit outside the table still has to read as a failure
        MonitorState::Monitored => table
            .first_failure(service)
            .unwrap_or("Failed")
            .to_string(),
    };
    if let Some(action) = service.pending_action {
        label.push_str(&format!(" - {action} pending"));
    }
    label
}

pub fn status_tone(service: &Service) -> StatusTone {
    match service.monitor {
        MonitorState::Monitored if service.error.is_empty() => StatusTone::Ok,
        MonitorState::Monitored => StatusTone::Failed,
        _ => StatusTone::Inactive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ErrorFlags, ServiceType};

    fn monitored(kind: ServiceType) -> Service {
        let mut s = Service::new("svc", kind);
        s.monitor = MonitorState::Monitored;
        s
    }

    #[test]
    fn clean_service_uses_type_label() {
        let table = EventTable::default();
        assert_eq!(describe_status(&monitored(ServiceType::Process), &table), "Running");
        assert_eq!(describe_status(&monitored(ServiceType::File), &table), "Accessible");
        assert_eq!(
            describe_status(&monitored(ServiceType::Host), &table),
            "Online with all services"
        );
    }

    #[test]
    fn state_label_beats_errors() {
        let table = EventTable::default();
        let mut s = monitored(ServiceType::Process);
        s.error = ErrorFlags::NONE | Event::Pid;

        s.monitor = MonitorState::Waiting;
        assert_eq!(describe_status(&s, &table), "Waiting");
        s.monitor = MonitorState::Initializing;
        assert_eq!(describe_status(&s, &table), "Initializing");
        s.monitor = MonitorState::NotMonitored;
        assert_eq!(describe_status(&s, &table), "Not monitored");
        assert_eq!(status_tone(&s), StatusTone::Inactive);
    }

    #[test]
    fn first_failing_row_wins() {
        let table = EventTable::default();
        let mut s = monitored(ServiceType::File);
        s.error = [Event::Uid, Event::Checksum, Event::Size].into_iter().collect();
        assert_eq!(describe_status(&s, &table), "Checksum failed");
        assert_eq!(status_tone(&s), StatusTone::Failed);

        s.error_hint = ErrorFlags::NONE | Event::Checksum;
        assert_eq!(describe_status(&s, &table), "Checksum changed");
    }

    #[test]
    fn custom_order_changes_precedence() {
        let table = EventTable::new(vec![
            EventDescription::new(Event::Uid, "owner wrong", "owner changed"),
            EventDescription::new(Event::Checksum, "bad sum", "sum changed"),
        ]);
        let mut s = monitored(ServiceType::File);
        s.error = [Event::Checksum, Event::Uid].into_iter().collect();
        assert_eq!(describe_status(&s, &table), "owner wrong");

        s.error = ErrorFlags::NONE | Event::Timeout;
        assert_eq!(describe_status(&s, &table), "Failed");
    }

    #[test]
    fn pending_action_is_appended() {
        let table = EventTable::default();
        let mut s = monitored(ServiceType::Process);
        s.pending_action = Some(Action::Restart);
        assert_eq!(describe_status(&s, &table), "Running - restart pending");

        s.monitor = MonitorState::NotMonitored;
        s.pending_action = Some(Action::Monitor);
        assert_eq!(describe_status(&s, &table), "Not monitored - monitor pending");
    }
}
