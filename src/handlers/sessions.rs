// src/handlers/sessions.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::session::SubmitExamRequest,
    repository::ExamRepository,
    services::{access::Caller, submission},
    state::AppState,
    utils::jwt::Claims,
};

/// Submits all answers for an exam in one request and returns the scored session.
///
/// Late submissions are rejected with 400 and leave no trace.
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    let detail =
        submission::submit(state.repo.as_ref(), state.clock.as_ref(), caller, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_my_sessions(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(submission::list_my_sessions(repo.as_ref(), caller).await?))
}

pub async fn list_exam_sessions(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(
        submission::list_exam_sessions(repo.as_ref(), caller, exam_id).await?,
    ))
}

pub async fn get_session(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(submission::get_session(repo.as_ref(), caller, id).await?))
}
