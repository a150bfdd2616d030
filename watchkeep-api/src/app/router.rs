use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{
    about, alive, do_action, get_id, handler_404, home, ping, runtime, runtime_action,
    service_action, service_page, status, status2, view_log,
};
use super::middleware::access_middleware;
use super::state::AppState;

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState) -> Router {
    // informational pages
    let info_routes = Router::new()
        .route("/_about", get(about))
        .route("/_ping", get(ping))
        .route("/_getid", get(get_id))
        .route("/_monit", get(alive));

    let status_routes = Router::new()
        .route("/", get(home))
        .route("/_status", get(status))
        .route("/_status2", get(status2))
        .route("/_runtime", get(runtime).post(runtime_action))
        .route("/_viewlog", get(view_log));

    // static paths above win over the service name capture
    let action_routes = Router::new()
        .route("/_doaction", post(do_action))
        .route("/:name", get(service_page).post(service_action));

    Router::new()
        .merge(info_routes)
        .merge(status_routes)
        .merge(action_routes)
        .fallback(handler_404)
        .layer(from_fn_with_state(state.clone(), access_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
