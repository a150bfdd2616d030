use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use watchkeep_core::Identity;

use super::error::ApiError;
use super::state::AppState;

/// The identity attached by [`access_middleware`]; anonymous when absent.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    fn from_request_parts<'a, 'b, 'c>(
        parts: &'a mut Parts,
        _state: &'b S,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'c>>
    where
        'a: 'c,
        'b: 'c,
    {
        Box::pin(async move {
            Ok(Caller(
                parts
                    .extensions
                    .get::<Identity>()
                    .cloned()
                    .unwrap_or_default(),
            ))
        })
    }
}

fn header_str<'r>(request: &'r Request<Body>, name: &str) -> Option<&'r str> {
    request.headers().get(name)?.to_str().ok()
}

/// Client address: X-Real-IP, then the first X-Forwarded-For hop, then the socket.
fn extract_client_ip(request: &Request<Body>) -> String {
    let proxied = header_str(request, "X-Real-IP")
        .map(str::trim)
        .or_else(|| {
            header_str(request, "X-Forwarded-For")
                .and_then(|list| list.split(',').next())
                .map(str::trim)
        })
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = proxied {
        return ip.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}

/// Decoded `Authorization: Basic` pair. `Ok(None)` when the header is absent.
fn basic_credentials(request: &Request<Body>) -> Result<Option<(String, String)>, ()> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let encoded = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(())?;
    let decoded = BASE64.decode(encoded.trim()).map_err(|_| ())?;
    let decoded = String::from_utf8(decoded).map_err(|_| ())?;
    let (user, password) = decoded.split_once(':').ok_or(())?;
    Ok(Some((user.to_string(), password.to_string())))
}

/// Applies the host allow list and resolves the caller's identity.
pub async fn access_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let client_ip = extract_client_ip(&request);
    if !state.policy.host_allowed(&client_ip) {
        tracing::warn!(client = %client_ip, "denied connection from host not in allow list");
        return Err(ApiError::forbidden("You are not allowed to access this server"));
    }

    let credentials = basic_credentials(&request);
    if !matches!(credentials, Ok(None)) && !state.auth_limiter.check(&client_ip).await {
        tracing::warn!(client = %client_ip, "authentication rate limit hit");
        return Err(ApiError::too_many_requests(
            "Too many failed login attempts, try again later",
        ));
    }

    let identity = match credentials {
        Ok(None) => Identity::Anonymous,
        Ok(Some((user, password))) => match state.policy.authenticate(&user, &password) {
            Ok(identity) => identity,
            Err(_) => return Err(reject(&state, &client_ip, Some(&user)).await),
        },
        Err(()) => return Err(reject(&state, &client_ip, None).await),
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Counts a failed attempt against the client.
async fn reject(state: &AppState, client_ip: &str, user: Option<&str>) -> ApiError {
    state.auth_limiter.record(client_ip).await;
    tracing::warn!(client = %client_ip, user = user.unwrap_or("-"), "authentication failed");
    ApiError::unauthorized()
}
