//! Consumer of the action queue: waits for the wake signal or the poll
//! interval, executes pending actions and clears them.

use crate::error::{ControlError, Result};
use crate::models::{Action, MonitorState, ProgramSpec};
use crate::registry::RegistryHandle;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Everything needed to carry out one pending action without the Run lock.
#[derive(Debug, Clone)]
pub struct ActionJob {
    pub service: String,
    pub action: Action,
    pub start: Option<ProgramSpec>,
    pub stop: Option<ProgramSpec>,
}

/// Performs the side effect of an action.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, job: &ActionJob) -> impl Future<Output = Result<()>> + Send;
}

/// Runs the configured start/stop programs.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    async fn run_program(&self, service: &str, what: &str, program: Option<&ProgramSpec>) -> Result<()> {
        let Some(program) = program else {
            warn!(service = %service, "no {what} program configured");
            return Ok(());
        };
        let (bin, args) = program
            .argv
            .split_first()
            .ok_or_else(|| ControlError::Config(format!("empty {what} program for {service}")))?;

        let mut cmd = Command::new(bin);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        {
            if let Some(uid) = program.uid {
                cmd.uid(uid);
            }
            if let Some(gid) = program.gid {
                cmd.gid(gid);
            }
        }

        info!(service = %service, program = %program, "running {what} program");
        let mut child = cmd.spawn()?;
        let timeout = Duration::from_secs(program.timeout_secs);
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(ControlError::Other(format!(
                        "{what} program for {service} failed with {status}"
                    )))
                }
            }
            Err(_) => {
                let _ = child.kill().await;
                Err(ControlError::Other(format!(
                    "{what} program for {service} timed out after {}s",
                    program.timeout_secs
                )))
            }
        }
    }
}

impl ActionExecutor for CommandExecutor {
    async fn execute(&self, job: &ActionJob) -> Result<()> {
        match job.action {
            Action::Start => {
                self.run_program(&job.service, "start", job.start.as_ref())
                    .await
            }
            Action::Stop => self.run_program(&job.service, "stop", job.stop.as_ref()).await,
            Action::Restart => {
                self.run_program(&job.service, "stop", job.stop.as_ref())
                    .await?;
                self.run_program(&job.service, "start", job.start.as_ref())
                    .await
            }
            Action::Monitor | Action::Unmonitor => Ok(()),
        }
    }
}

/// Monitoring state a service moves to once `action` has run.
pub fn monitor_effect(action: Action) -> MonitorState {
    match action {
        Action::Start | Action::Restart | Action::Monitor => MonitorState::Initializing,
        Action::Stop | Action::Unmonitor => MonitorState::NotMonitored,
    }
}

pub struct Scheduler<E> {
    handle: RegistryHandle,
    executor: E,
    poll: Duration,
    start_delay: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<E: ActionExecutor> Scheduler<E> {
    pub fn new(
        handle: RegistryHandle,
        executor: E,
        poll: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            handle,
            executor,
            poll,
            start_delay: Duration::ZERO,
            shutdown,
        }
    }

    /// Delay before the first cycle.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Runs until the shutdown signal flips or its sender goes away.
    pub async fn run(mut self) {
        if !self.start_delay.is_zero() {
            info!(delay_secs = self.start_delay.as_secs(), "delaying scheduler start");
            tokio::select! {
                _ = self.shutdown.changed() => return,
                _ = tokio::time::sleep(self.start_delay) => {}
            }
        }
        info!(poll_secs = self.poll.as_secs(), "scheduler started");
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                woke = self.handle.wait_for_wakeup(self.poll) => {
                    debug!(woke, "scheduler cycle");
                    self.run_pending().await;
                }
            }
        }
        info!("scheduler stopped");
    }

    /// Executes every pending action once. Returns how many were processed.
    #[instrument(skip_all)]
    pub async fn run_pending(&self) -> usize {
        self.handle.take_action_pending();
        let jobs: Vec<ActionJob> = {
            let registry = self.handle.lock().await;
            registry
                .iter()
                .filter_map(|s| {
                    s.pending_action.map(|action| ActionJob {
                        service: s.name.clone(),
                        action,
                        start: s.start.clone(),
                        stop: s.stop.clone(),
                    })
                })
                .collect()
        };

        for job in &jobs {
            if let Err(e) = self.executor.execute(job).await {
                error!(service = %job.service, action = %job.action, error = %e, "action failed");
            }

            let mut registry = self.handle.lock().await;
            let finished = registry.find_mut(&job.service).map(|s| {
                s.monitor = monitor_effect(job.action);
            });
            if finished.is_err() {
                continue;
            }
            match registry.complete_action(&job.service) {
                Ok(token) => info!(
                    service = %job.service,
                    action = %job.action,
                    token = token.as_deref().unwrap_or("-"),
                    "action done"
                ),
                Err(e) => warn!(service = %job.service, error = %e, "cannot clear action"),
            }
        }
        jobs.len()
    }
}
