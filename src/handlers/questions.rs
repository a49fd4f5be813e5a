// src/handlers/questions.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::question::{BulkQuestionItem, CreateQuestionRequest, UpdateQuestionRequest},
    repository::ExamRepository,
    services::{access::Caller, questions},
    utils::jwt::Claims,
};

/// Adds a single question to an exam the caller owns.
pub async fn add_question(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    let question = questions::add_question(repo.as_ref(), caller, exam_id, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Adds a list of questions in one go. Every item must name the same exam.
pub async fn add_questions_bulk(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<Vec<BulkQuestionItem>>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    let created = questions::add_questions_bulk(repo.as_ref(), caller, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_questions(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(questions::list_questions(repo.as_ref(), caller, exam_id).await?))
}

/// Question sheet for an assigned student. Correct options are withheld.
pub async fn exam_paper(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    Ok(Json(questions::exam_paper(repo.as_ref(), caller, exam_id).await?))
}

pub async fn update_question(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    let caller = Caller::try_from(&claims)?;
    Ok(Json(
        questions::update_question(repo.as_ref(), caller, id, payload).await?,
    ))
}

pub async fn delete_question(
    State(repo): State<Arc<dyn ExamRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let caller = Caller::try_from(&claims)?;
    questions::delete_question(repo.as_ref(), caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
