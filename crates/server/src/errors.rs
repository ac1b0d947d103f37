use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use models::errors::ModelError;
use service::{auth::errors::AuthError, errors::ServiceError};

/// JSON error body: `{"error": kind, "code": n, "message": text}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub code: u16,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: u16,
    message: &'a str,
}

pub fn status_of(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ServiceError::InvalidTransition(_)
        | ServiceError::CapacityExceeded(_)
        | ServiceError::DuplicateReport(_)
        | ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) | ServiceError::InsufficientBalance(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Model(ModelError::Validation(_)) => StatusCode::BAD_REQUEST,
        ServiceError::Model(ModelError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        let e = ServiceError::Unauthorized(message.into());
        e.into()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self { status: status_of(&e), kind: e.kind(), code: e.code(), message: e.to_string() }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ServiceError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = self.kind, code = self.code, error = %self.message, "request failed");
        } else {
            debug!(kind = self.kind, code = self.code, error = %self.message, "request rejected");
        }
        let body = ErrorBody { error: self.kind, code: self.code, message: &self.message };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
