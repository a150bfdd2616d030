use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::Html;
use tracing::{debug, info, instrument};
use watchkeep_core::RunInfo;

use crate::app::middleware::Caller;
use crate::app::params::FormParams;
use crate::app::views::{render, Button, Params, RuntimePage, Shell, ViewLogPage};
use crate::app::{ApiError, AppState};

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "True"
    } else {
        "False"
    }
}

fn runtime_page(run: &RunInfo, read_only: bool) -> RuntimePage {
    let mut p = Params::default();
    p.text("ID", &run.id)
        .text("Host", &run.hostname)
        .text("Process id", run.pid.to_string())
        .text("Effective user running watchkeep", &run.user)
        .text("Control file", run.control_file.display().to_string());
    if let Some(log) = &run.log_file {
        p.text("Log file", log.display().to_string());
    }
    if let Some(pid) = &run.pid_file {
        p.text("Pid file", pid.display().to_string());
    }
    if let Some(state) = &run.state_file {
        p.text("State file", state.display().to_string());
    }
    p.text("Debug", yes_no(run.debug))
        .text("Log", yes_no(run.logging()))
        .text(
            "Poll time",
            format!("{} seconds", run.poll_interval_secs),
        );
    if run.start_delay_secs > 0 {
        p.text("Start delay", format!("{} seconds", run.start_delay_secs));
    }
    p.text("httpd bind address", run.bind_address())
        .text("httpd portnumber", run.bind.port().to_string())
        .text("httpd signature", if run.signature { "Enabled" } else { "Disabled" })
        .text("httpd auth. style", &run.auth_style);
    for alert in &run.alerts {
        let mut value = format!("{} ({})", alert.to, alert.describe_events());
        if alert.reminder > 0 {
            value.push_str(&format!(" reminder every {} cycle(s)", alert.reminder));
        }
        p.text("Alert mail to", value);
    }

    let buttons = if read_only {
        Vec::new()
    } else {
        vec![
            Button::new("/_runtime", "stop", "Stop http server"),
            Button::new("/_runtime", "validate", "Force validate now"),
        ]
    };
    RuntimePage {
        shell: Shell::new(run, "Runtime"),
        rows: p.finish(),
        buttons,
        view_log: !read_only && run.logging(),
    }
}

fn show(state: &AppState, caller: &Caller) -> Result<Html<String>, ApiError> {
    let read_only = state.policy.is_read_only(&caller.0);
    render(&runtime_page(&state.run, read_only))
}

#[instrument(skip_all)]
pub async fn runtime(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Html<String>, ApiError> {
    show(&state, &caller)
}

/// `action=validate` wakes the scheduler and `action=stop` stops the listener.
/// Other actions just render the page.
#[instrument(skip_all)]
pub async fn runtime_action(
    State(state): State<AppState>,
    caller: Caller,
    RawQuery(query): RawQuery,
    body: String,
) -> Result<Html<String>, ApiError> {
    let params = FormParams::parse(query.as_deref(), &body);
    let Some(action) = params.get("action") else {
        return show(&state, &caller);
    };
    state.policy.require_write(&caller.0)?;

    if action.eq_ignore_ascii_case("validate") {
        info!("The watchkeep daemon woke up on user request");
        state.registry.wake_scheduler();
        show(&state, &caller)
    } else if action.eq_ignore_ascii_case("stop") {
        info!("The watchkeep http server stopped on user request");
        let _ = state.http_shutdown.send(true);
        Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "The watchkeep http server is stopped",
        ))
    } else {
        debug!(action, "ignoring unknown runtime action");
        show(&state, &caller)
    }
}

#[instrument(skip_all)]
pub async fn view_log(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Html<String>, ApiError> {
    state.policy.require_write(&caller.0)?;

    let shell = Shell::new(&state.run, "View log");
    let page = match &state.run.log_file {
        None => ViewLogPage {
            shell,
            heading: "Cannot view logfile".to_string(),
            contents: None,
            note: Some("watchkeep was started without logging".to_string()),
        },
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(contents) => ViewLogPage {
                shell,
                heading: path.display().to_string(),
                contents: Some(contents),
                note: None,
            },
            Err(e) => ViewLogPage {
                shell,
                heading: "Cannot view logfile".to_string(),
                contents: None,
                note: Some(format!("Error opening logfile: {e}")),
            },
        },
    };
    render(&page)
}
