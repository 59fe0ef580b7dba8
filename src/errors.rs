//! Typed error kinds (spec §7) and their mapping onto the wire error shape.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or type-mismatched input. 422.
    #[error("{0}")]
    Schema(String),

    /// Valid shape, violates a business rule. 400/422.
    #[error("{0}")]
    Invariant(String),

    /// Uniqueness or state conflict. 409/422.
    #[error("{0}")]
    Conflict(String),

    /// Missing under the ownership filter, including cross-tenant access. 404.
    #[error("{0}")]
    NotFound(String),

    /// Missing/expired/invalid/blacklisted token. 401.
    #[error("{0}")]
    Auth(String),

    /// Authenticated but lacking the role capability. 403.
    #[error("{0}")]
    Permission(String),

    /// Soft rate limit exceeded. 429.
    #[error("rate limit exceeded")]
    RateLimit,

    /// Database or external-service failure.
    #[error(transparent)]
    Dependency(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn invariant(what: impl Into<String>) -> Self {
        AppError::Invariant(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        AppError::Conflict(what.into())
    }

    pub fn permission(what: impl Into<String>) -> Self {
        AppError::Permission(what.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Invariant(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Permission(_) => StatusCode::FORBIDDEN,
            AppError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, AppError::Dependency(_)) {
            tracing::error!(error = %self, "dependency failure");
        }
        let detail = match &self {
            // Never leak internal error text for dependency failures.
            AppError::Dependency(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
