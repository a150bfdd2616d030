use axum::http::{header, HeaderValue, StatusCode};
use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use watchkeep_core::ControlError;

use super::views::ErrorPage;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "You are not authorized to access this page",
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, message)
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::NotFound(name) => {
                ApiError::not_found(format!("There is no service named \"{name}\""))
            }
            ControlError::InvalidAction(action) => {
                ApiError::bad_request(format!("Invalid action \"{action}\""))
            }
            ControlError::InvalidInput(msg) => ApiError::bad_request(msg),
            ControlError::Conflict(name) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Other action already in progress for {name} -- please try again later"),
            ),
            ControlError::Forbidden(msg) => ApiError::forbidden(msg),
            other => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let reason = self.status.canonical_reason().unwrap_or("Error");
        let page = ErrorPage {
            code: self.status.as_u16(),
            reason,
            message: &self.message,
        };
        let mut response = match page.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, format!("{reason}: {}", self.message)).into_response(),
        };
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"watchkeep\""),
            );
        }
        response
    }
}
