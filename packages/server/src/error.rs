use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::Round;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `ROUND_DISABLED`, `ALREADY_ATTEMPTED`, `IMMUTABLE_CHOICE`,
    /// `INVALID_SCORE`, `CONFLICT`, `USERNAME_TAKEN`, `STORAGE_UNAVAILABLE`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "ROUND_DISABLED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Round 2 is currently disabled")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    /// The access gate for this round reads disabled. Retryable once an
    /// admin re-enables the round.
    RoundDisabled(Round),
    /// A submission for this (participant, round) already exists. Terminal.
    AlreadyAttempted(String),
    /// The Round 3 track is already set to a different value.
    ImmutableChoice,
    /// Manual score outside the accepted pair.
    InvalidScore { accept: i32, reject: i32 },
    Conflict(String),
    UsernameTaken,
    /// Storage failed before anything was committed; safe to retry.
    Transient(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::RoundDisabled(round) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "ROUND_DISABLED",
                    message: format!("Round {round} is currently disabled"),
                },
            ),
            AppError::AlreadyAttempted(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "ALREADY_ATTEMPTED",
                    message: msg,
                },
            ),
            AppError::ImmutableChoice => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "IMMUTABLE_CHOICE",
                    message: "Round 3 track is already chosen and cannot be changed".into(),
                },
            ),
            AppError::InvalidScore { accept, reject } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_SCORE",
                    message: format!("Manual score must be exactly {accept} or {reject}"),
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "USERNAME_TAKEN",
                    message: "Username is already taken".into(),
                },
            ),
            AppError::Transient(detail) => {
                tracing::warn!("Transient storage error: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "STORAGE_UNAVAILABLE",
                        message: "Storage temporarily unavailable, please retry".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AppError::Transient(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}
