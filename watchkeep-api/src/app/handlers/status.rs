use axum::extract::{RawQuery, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::instrument;
use watchkeep_core::render::{render_text, StatusSnapshot};
use watchkeep_core::{Scope, StatusFormat, StatusLevel};

use crate::app::params::FormParams;
use crate::app::{ApiError, AppState};

async fn status_document(
    state: &AppState,
    query: Option<String>,
    version: u8,
) -> Result<Response, ApiError> {
    let params = FormParams::parse(query.as_deref(), "");
    let format = StatusFormat::parse(params.get("format"))?;
    let level = StatusLevel::parse(params.get("level"))?;
    let scope = match params.get("service") {
        Some(name) => Scope::One(name),
        None => Scope::All,
    };

    let body = match format {
        StatusFormat::Text => {
            let registry = state.registry.lock().await;
            render_text(&registry, &state.run, level, scope)?
        }
        StatusFormat::Xml => {
            let snapshot = {
                let registry = state.registry.lock().await;
                StatusSnapshot::capture(&registry, &state.run, level, scope, version)?
            };
            snapshot.to_xml()?
        }
    };
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

#[instrument(skip_all)]
pub async fn status(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    status_document(&state, query, 1).await
}

#[instrument(skip_all)]
pub async fn status2(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    status_document(&state, query, 2).await
}
