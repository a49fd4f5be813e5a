// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::config::MAX_QUESTIONS_PER_EXAM;

/// Message returned when a submission arrives after its deadline.
pub const EXAM_TIME_EXCEEDED_MESSAGE: &str = "Exam time exceeded. Submission rejected.";

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden: the caller's role does not allow the operation
    PermissionDenied(String),

    // 403 Forbidden: the caller is not the teacher who owns the exam
    NotOwner(String),

    // 404 Not Found
    NotFound(String),

    // 404 Not Found: teacher/student account without its profile record
    ProfileNotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    // 400: adding questions would push the exam past its cap
    CapacityExceeded(String),

    // 400: a bulk question insert names more than one exam
    InconsistentBatch,

    // 400: an answer references a question outside the exam
    InvalidQuestionReference(String),

    // 400: submission arrived after start_time + duration
    ExamTimeExceeded,
}

impl AppError {
    /// Builds the capacity error for an exam currently holding `existing` questions.
    pub fn capacity_exceeded(existing: usize) -> Self {
        let remaining = MAX_QUESTIONS_PER_EXAM.saturating_sub(existing);
        if remaining == 0 {
            AppError::CapacityExceeded(format!(
                "Maximum {} questions allowed.",
                MAX_QUESTIONS_PER_EXAM
            ))
        } else {
            AppError::CapacityExceeded(format!(
                "Only {} more question(s) allowed for this exam.",
                remaining
            ))
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::PermissionDenied(msg) | AppError::NotOwner(msg) => {
                (StatusCode::FORBIDDEN, msg)
            }
            AppError::NotFound(msg) | AppError::ProfileNotFound(msg) => {
                (StatusCode::NOT_FOUND, msg)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::CapacityExceeded(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InconsistentBatch => (
                StatusCode::BAD_REQUEST,
                "All questions must belong to the same exam.".to_string(),
            ),
            AppError::InvalidQuestionReference(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ExamTimeExceeded => (
                StatusCode::BAD_REQUEST,
                EXAM_TIME_EXCEEDED_MESSAGE.to_string(),
            ),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
