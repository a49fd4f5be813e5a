// src/handlers/exams.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam::{AssignStudentsRequest, CreateExamRequest, UpdateExamRequest},
    repository::ExamRepository,
    services::{access::Caller, exams},
    utils::jwt::Claims,
};

/// Creates an exam owned by the calling teacher.
pub async fn create_exam(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    let exam = exams::create_exam(repo.as_ref(), caller, payload).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn list_exams(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(exams::list_exams(repo.as_ref(), caller).await?))
}

/// Exams the calling student is assigned to.
pub async fn list_assigned(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(exams::list_assigned(repo.as_ref(), caller).await?))
}

pub async fn get_exam(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(exams::get_exam(repo.as_ref(), caller, id).await?))
}

pub async fn update_exam(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(exams::update_exam(repo.as_ref(), caller, id, payload).await?))
}

/// Deletes an exam along with everything attached to it.
pub async fn delete_exam(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    exams::delete_exam(repo.as_ref(), caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_students(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignStudentsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(exams::assign_students(repo.as_ref(), caller, id, payload).await?))
}
