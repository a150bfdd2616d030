//! Core library for the watchkeep daemon: service registry, monitoring state,
//! action queue, status projection and the authorization gate.

pub mod auth;
pub mod config;
mod error;
pub mod models;
pub mod probe;
mod registry;
pub mod render;
pub mod runtime;
pub mod scheduler;
pub mod status;
pub mod xalloc;

pub use auth::{AccessPolicy, Credential, Identity};
pub use config::ControlFile;
pub use error::{ControlError, Result};
pub use models::{Action, MonitorState, Service, ServiceGroup, ServiceType};
pub use registry::{Collection, PendingAction, Registry, RegistryHandle};
pub use render::{Scope, StatusFormat, StatusLevel};
pub use runtime::{RunInfo, VERSION};
pub use scheduler::{ActionExecutor, CommandExecutor, Scheduler};
pub use status::{describe_status, EventTable};
