use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use tracing::instrument;
use watchkeep_core::ControlError;

use crate::app::middleware::Caller;
use crate::app::params::FormParams;
use crate::app::{ApiError, AppState};

/// Queues one action on every `service` parameter, in request order.
/// Names before the first failing one stay queued.
#[instrument(skip_all)]
pub async fn do_action(
    State(state): State<AppState>,
    caller: Caller,
    RawQuery(query): RawQuery,
    body: String,
) -> Result<StatusCode, ApiError> {
    let params = FormParams::parse(query.as_deref(), &body);
    let Some(action) = params.get("action") else {
        return Ok(StatusCode::OK);
    };
    state.policy.require_write(&caller.0)?;

    let services = params.all("service");
    state
        .registry
        .request_batch_action(action, &services, params.get("token"))
        .await
        .map_err(|e| match e {
            ControlError::NotFound(name) => {
                ApiError::bad_request(format!("There is no service named \"{name}\""))
            }
            other => other.into(),
        })?;
    Ok(StatusCode::OK)
}
