use crate::error::{ControlError, Result};
use crate::models::{Service, ServiceGroup, ServiceType};
use crate::status::EventTable;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, Notify};

mod actions;
mod collect;
mod groups;

pub use actions::PendingAction;
pub use collect::Collection;

/// Declaration-ordered, name-indexed set of services plus the group registry.
#[derive(Debug, Default)]
pub struct Registry {
    services: Vec<Service>,
    index: HashMap<String, usize>,
    groups: Vec<ServiceGroup>,
    table: EventTable,
}

impl Registry {
    pub fn new(table: EventTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Appends a service; names must be unique.
    pub fn insert(&mut self, service: Service) -> Result<()> {
        if self.index.contains_key(&service.name) {
            return Err(ControlError::Config(format!(
                "duplicate service name: {}",
                service.name
            )));
        }
        self.index.insert(service.name.clone(), self.services.len());
        self.services.push(service);
        Ok(())
    }

    pub fn add_group(&mut self, group: ServiceGroup) {
        self.groups.push(group);
    }

    /// Exact, case-sensitive lookup.
    pub fn find(&self, name: &str) -> Result<&Service> {
        self.index
            .get(name)
            .map(|&i| &self.services[i])
            .ok_or_else(|| ControlError::NotFound(name.to_string()))
    }

    pub(crate) fn find_mut(&mut self, name: &str) -> Result<&mut Service> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.services[i]),
            None => Err(ControlError::NotFound(name.to_string())),
        }
    }

    /// Services in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    /// Declaration-ordered services of one type; empty when none exist.
    pub fn by_type(&self, kind: ServiceType) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(move |s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn groups(&self) -> &[ServiceGroup] {
        &self.groups
    }

    pub fn event_table(&self) -> &EventTable {
        &self.table
    }
}

/// Shared handle to the registry: the Run lock plus the scheduler wake signal.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<Registry>>,
    wakeup: Arc<Notify>,
    action_pending: Arc<AtomicBool>,
    wakeups: Arc<AtomicU64>,
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
            wakeup: Arc::new(Notify::new()),
            action_pending: Arc::new(AtomicBool::new(false)),
            wakeups: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquires the Run lock. Hold the guard for a whole read-modify-write or
    /// multi-section render.
    pub async fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().await
    }

    /// Wakes the scheduler. A wake sent while it is busy is kept for its next wait.
    pub fn wake_scheduler(&self) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
        self.wakeup.notify_one();
    }

    /// Number of wake signals sent so far.
    pub fn wakeup_count(&self) -> u64 {
        self.wakeups.load(Ordering::SeqCst)
    }

    /// Waits for a wake signal or the poll interval; returns true when woken.
    pub async fn wait_for_wakeup(&self, poll: Duration) -> bool {
        tokio::time::timeout(poll, self.wakeup.notified())
            .await
            .is_ok()
    }

    /// Process-wide "some action is pending" flag.
    pub fn action_pending(&self) -> bool {
        self.action_pending.load(Ordering::SeqCst)
    }

    pub(crate) fn flag_action_pending(&self) {
        self.action_pending.store(true, Ordering::SeqCst);
    }

    /// Clears the flag and reports whether it was set.
    pub fn take_action_pending(&self) -> bool {
        self.action_pending.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ServiceType;

    pub(crate) fn sample_registry() -> Registry {
        let mut registry = Registry::new(EventTable::default());
        registry
            .insert(Service::new("localhost", ServiceType::System))
            .unwrap();
        registry
            .insert(Service::new("nginx", ServiceType::Process))
            .unwrap();
        registry
            .insert(Service::new("rootfs", ServiceType::Filesystem))
            .unwrap();
        registry
            .insert(Service::new("postgres", ServiceType::Process))
            .unwrap();
        registry
    }

    #[test]
    fn find_is_exact_and_case_sensitive() {
        let registry = sample_registry();
        assert_eq!(registry.find("nginx").unwrap().kind, ServiceType::Process);
        assert!(matches!(
            registry.find("NGINX"),
            Err(ControlError::NotFound(_))
        ));
        assert!(registry.find("ngin").is_err());
    }

    #[test]
    fn iteration_keeps_declaration_order() {
        let registry = sample_registry();
        let names: Vec<_> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["localhost", "nginx", "rootfs", "postgres"]);

        let procs: Vec<_> = registry
            .by_type(ServiceType::Process)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(procs, ["nginx", "postgres"]);
        assert_eq!(registry.by_type(ServiceType::Fifo).count(), 0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = sample_registry();
        let err = registry
            .insert(Service::new("nginx", ServiceType::File))
            .unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
        assert_eq!(registry.len(), 4);
    }

    #[tokio::test]
    async fn wake_is_not_lost_when_scheduler_busy() {
        let handle = RegistryHandle::new(sample_registry());
        handle.wake_scheduler();
        assert!(handle.wait_for_wakeup(Duration::from_millis(50)).await);
        assert!(!handle.wait_for_wakeup(Duration::from_millis(20)).await);
        assert_eq!(handle.wakeup_count(), 1);
    }
}
