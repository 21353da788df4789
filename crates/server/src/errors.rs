use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::auth::AuthError;
use service::tasks::TaskError;
use thiserror::Error;
use tracing::error;

/// Challenge sent with a 401 when no usable bearer token was presented.
pub const CHALLENGE_MISSING: &str = r#"Bearer realm="api""#;
/// Challenge sent with a 401 when a presented token was rejected.
pub const CHALLENGE_INVALID_TOKEN: &str = r#"Bearer realm="api", error="invalid_token""#;
/// Challenge sent with a 401 for a failed login.
pub const CHALLENGE_INVALID_CREDENTIALS: &str = r#"Bearer realm="api", error="invalid_credentials""#;

/// JSON error response: `{"error": title, "details": ...}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: String,
    pub details: Option<String>,
    pub challenge: Option<&'static str>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &str, details: Option<String>) -> Self {
        Self { status, title: title.to_string(), details, challenge: None }
    }

    pub fn unauthorized(challenge: &'static str) -> Self {
        Self { challenge: Some(challenge), ..Self::new(StatusCode::UNAUTHORIZED, "unauthorized", None) }
    }

    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid payload", Some(details.into()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.title, details = ?self.details, "request failed");
        }
        let body = ErrorBody { error: self.title, details: self.details };
        let mut resp = (self.status, Json(body)).into_response();
        if let Some(challenge) = self.challenge {
            resp.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        resp
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => Self::bad_request(msg),
            AuthError::Conflict => Self::new(StatusCode::CONFLICT, "user exists", None),
            AuthError::Unauthorized => Self::unauthorized(CHALLENGE_INVALID_TOKEN),
            AuthError::HashError(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error", Some(format!("code {}", e.code())))
            }
        }
    }
}

impl From<TaskError> for JsonApiError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::NotFound => Self::new(StatusCode::NOT_FOUND, "task not found", None),
            TaskError::NotReady => Self::new(StatusCode::CONFLICT, "task not ready", None),
            TaskError::DuplicateId(_) | TaskError::QueueClosed => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to create task", Some(e.to_string()))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
