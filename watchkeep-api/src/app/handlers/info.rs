use axum::extract::{ConnectInfo, State};
use axum::http::{StatusCode, Uri};
use axum::response::Html;
use std::net::SocketAddr;
use watchkeep_core::runtime::daemon_pid;

use crate::app::views::{render, AboutPage, Shell};
use crate::app::{ApiError, AppState};

pub async fn about(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render(&AboutPage {
        shell: Shell::new(&state.run, "About"),
    })
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn get_id(State(state): State<AppState>) -> String {
    state.run.id.clone()
}

/// 200 while the daemon named by the pid file is alive, 410 otherwise.
pub async fn alive(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let running = match &state.run.pid_file {
        Some(path) => daemon_pid(path).is_some(),
        None => true,
    };
    if running {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::gone("The watchkeep daemon is not running"))
    }
}

pub async fn handler_404(uri: Uri, addr: Option<ConnectInfo<SocketAddr>>) -> ApiError {
    let ip = addr.map_or_else(|| "unknown".to_string(), |ConnectInfo(a)| a.ip().to_string());
    tracing::warn!(path = %uri.path(), client = %ip, "request for unknown page");
    ApiError::not_found(format!("The requested URL {} was not found", uri.path()))
}
