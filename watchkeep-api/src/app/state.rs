use std::sync::Arc;
use tokio::sync::watch;
use watchkeep_core::{AccessPolicy, RegistryHandle, RunInfo};

use super::RateLimiter;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryHandle,
    pub policy: Arc<AccessPolicy>,
    pub run: Arc<RunInfo>,
    /// Failed Basic authentication attempts, keyed by client address.
    pub auth_limiter: Arc<RateLimiter>,
    /// Flipped to `true` to stop the http listener.
    pub http_shutdown: Arc<watch::Sender<bool>>,
}
