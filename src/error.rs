use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can surface to a client.
///
/// Errors with a clear user-facing status are handled locally (401/403/404);
/// everything else ends up in `Internal` and is logged at the boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Unauthorized(String),

    /// Login mismatch. Same status as `Unauthorized` but a distinct kind so
    /// "bad token" and "bad credentials" stay distinguishable in the body.
    #[error("{0}")]
    InvalidCredentials(&'static str),

    #[error("User is not authorized")]
    Forbidden,

    #[error("Email already registered")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound => "NotFound",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::InvalidCredentials(_) => "InvalidCredentials",
            ApiError::Forbidden => "Forbidden",
            ApiError::Conflict => "Conflict",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return ApiError::Conflict;
            }
        }
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Log the cause, return a generic body. The underlying error may
            // quote SQL or config values that do not belong in a response.
            ApiError::Internal(cause) => {
                error!(error = %cause, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "error": format!("{}: {}", self.kind(), message) }));
        (status, body).into_response()
    }
}
