use super::*;
use crate::models::{ErrorFlags, IcmpStatus, MonitorState, PortStatus, ServiceInfo};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

/// One round of collected data for a service.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub info: Option<ServiceInfo>,
    pub ports: Vec<PortStatus>,
    pub icmp: Vec<IcmpStatus>,
    pub error: ErrorFlags,
    pub error_hint: ErrorFlags,
    /// New monitoring state, if the collector moved it.
    pub monitor: Option<MonitorState>,
    /// Defaults to now.
    pub collected: Option<DateTime<Utc>>,
}

impl Registry {
    pub(crate) fn apply_collection(&mut self, name: &str, collection: Collection) -> Result<()> {
        let service = self.find_mut(name)?;
        if let Some(info) = &collection.info {
            if info.kind() != service.kind {
                return Err(ControlError::InvalidInput(format!(
                    "{} data does not fit {} service {}",
                    info.kind().label(),
                    service.kind.label(),
                    name
                )));
            }
        }
        service.info = collection.info;
        service.ports = collection.ports;
        service.icmp = collection.icmp;
        service.error = collection.error;
        service.error_hint = collection.error_hint;
        if let Some(state) = collection.monitor {
            service.monitor = state;
        }
        service.collected = Some(collection.collected.unwrap_or_else(Utc::now));
        Ok(())
    }
}

impl RegistryHandle {
    /// Publishes collector output under the Run lock. Only the collector
    /// changes error bits.
    #[instrument(skip(self, collection))]
    pub async fn record_collection(&self, name: &str, collection: Collection) -> Result<()> {
        self.lock().await.apply_collection(name, collection)?;
        debug!(service = %name, "collection recorded");
        Ok(())
    }
}
