//! Action queue: at most one pending action per service, executed later by the scheduler.

use super::*;
use crate::models::Action;
use tracing::{info, instrument};

/// Snapshot of a queued action handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub service: String,
    pub action: Action,
}

impl Registry {
    /// Queues `action` on one service. Rejects a second request outright.
    pub fn queue_action(&mut self, name: &str, action: Action, token: Option<&str>) -> Result<()> {
        let service = self.find_mut(name)?;
        if service.pending_action.is_some() {
            return Err(ControlError::Conflict(name.to_string()));
        }
        service.pending_action = Some(action);
        if let Some(token) = token {
            service.action_token = Some(token.to_string());
        }
        Ok(())
    }

    /// Queues `action` on each name in caller order.
    ///
    /// The first unknown or busy name aborts the batch; names before it stay
    /// queued. On success the token goes to the last service (declaration
    /// order) whose pending action equals `action`.
    pub fn queue_batch(&mut self, action: Action, names: &[String], token: Option<&str>) -> Result<()> {
        for name in names {
            let service = self.find_mut(name)?;
            if service.pending_action.is_some() {
                return Err(ControlError::Conflict(name.clone()));
            }
            service.pending_action = Some(action);
            info!(service = %name, action = %action, "'{}' {} on user request", name, action);
        }

        if let Some(token) = token {
            if let Some(last) = self
                .services
                .iter_mut()
                .rev()
                .find(|s| s.pending_action == Some(action))
            {
                last.action_token = Some(token.to_string());
            }
        }
        Ok(())
    }

    /// All queued actions in declaration order. Nothing is cleared.
    pub fn pending_actions(&self) -> Vec<PendingAction> {
        self.services
            .iter()
            .filter_map(|s| {
                s.pending_action.map(|action| PendingAction {
                    service: s.name.clone(),
                    action,
                })
            })
            .collect()
    }

    /// Clears the pending action after execution and hands back the token.
    pub(crate) fn complete_action(&mut self, name: &str) -> Result<Option<String>> {
        let service = self.find_mut(name)?;
        service.pending_action = None;
        Ok(service.action_token.take())
    }
}

impl RegistryHandle {
    /// Queues an action on a single service and wakes the scheduler.
    ///
    /// Returns as soon as the action is queued; execution is asynchronous.
    #[instrument(skip(self, token))]
    pub async fn request_action(
        &self,
        name: &str,
        action_name: &str,
        token: Option<&str>,
    ) -> Result<Action> {
        let action = {
            let mut registry = self.lock().await;
            registry.find(name)?;
            let action: Action = action_name.parse()?;
            registry.queue_action(name, action, token)?;
            info!(service = %name, action = %action, "'{}' {} on user request", name, action);
            action
        };
        self.flag_action_pending();
        self.wake_scheduler();
        Ok(action)
    }

    /// Queues one action on several services; see [`Registry::queue_batch`].
    #[instrument(skip(self, names, token))]
    pub async fn request_batch_action(
        &self,
        action_name: &str,
        names: &[String],
        token: Option<&str>,
    ) -> Result<Action> {
        let action: Action = action_name.parse()?;
        self.lock().await.queue_batch(action, names, token)?;
        self.flag_action_pending();
        self.wake_scheduler();
        Ok(action)
    }
}
