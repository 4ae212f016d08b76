use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use parley_types::api::StatusResponse;

use crate::validation::FieldErrors;

pub const THREAD_UNAVAILABLE: &str = "Thread is not available";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-keyed input errors, rendered as the bare `{field: [msg]}` map.
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    /// 400 wrapped in the `{status: failure, detail}` envelope.
    #[error("request rejected: {0}")]
    Failure(serde_json::Value),

    /// Thread missing or caller not a participant; clients cannot tell which.
    #[error("thread not available")]
    ThreadUnavailable,

    #[error("not found")]
    NotFound,

    #[error("malformed body: {detail}")]
    MalformedBody { status: StatusCode, detail: String },

    #[error("authentication credentials were not provided")]
    Unauthenticated,

    #[error("token not valid")]
    InvalidToken,

    #[error("refresh token not valid")]
    InvalidRefreshToken,

    #[error("token subject no longer exists")]
    UserNotFound,

    #[error("bad credentials")]
    InvalidCredentials,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn failure(detail: impl Into<serde_json::Value>) -> Self {
        ApiError::Failure(detail.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::MalformedBody {
            status,
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::Failure(detail) => {
                (StatusCode::BAD_REQUEST, Json(StatusResponse::failure(detail))).into_response()
            }
            ApiError::ThreadUnavailable => (
                StatusCode::NOT_FOUND,
                Json(StatusResponse::failure(THREAD_UNAVAILABLE)),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            ApiError::MalformedBody { status, detail } => {
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Unauthenticated => unauthorized(json!({
                "detail": "Authentication credentials were not provided."
            })),
            ApiError::InvalidToken => unauthorized(json!({
                "detail": "Given token not valid for any token type",
                "code": "token_not_valid",
            })),
            ApiError::InvalidRefreshToken => unauthorized(json!({
                "detail": "Token is invalid or expired",
                "code": "token_not_valid",
            })),
            ApiError::UserNotFound => unauthorized(json!({
                "detail": "User not found",
                "code": "user_not_found",
            })),
            ApiError::InvalidCredentials => unauthorized(json!({
                "detail": "No active account found with the given credentials"
            })),
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

fn unauthorized(body: serde_json::Value) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, r#"Bearer realm="api""#)],
        Json(body),
    )
        .into_response()
}
