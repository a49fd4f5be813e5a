// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        profile::{CreateStudentRequest, CreateTeacherRequest},
        user::{CreateUserRequest, Role},
    },
    repository::ExamRepository,
    utils::{
        hash::hash_password,
        html::clean_required,
    },
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(
    State(repo): State<Arc<dyn ExamRepository>>,
) -> Result<impl IntoResponse, AppError> {
    let users = repo.list_users().await?;
    Ok(Json(users))
}

/// Creates a new account with the given role.
/// Admin only.
pub async fn create_user(
    State(repo): State<Arc<dyn ExamRepository>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let username = clean_required("username", &payload.username)?;
    let hashed_password = hash_password(&payload.password)?;

    let user = repo
        .create_user(&username, &hashed_password, payload.role)
        .await?;
    tracing::info!("Created {} account '{}'", user.role, user.username);

    Ok((StatusCode::CREATED, Json(user)))
}

/// The profile's user must exist and carry the matching role.
async fn ensure_account(
    repo: &dyn ExamRepository,
    user_id: i64,
    role: Role,
) -> Result<(), AppError> {
    let user = repo
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role != role {
        return Err(AppError::BadRequest(format!(
            "User {} has role '{}', expected '{}'",
            user.id, user.role, role
        )));
    }
    Ok(())
}

/// Attaches a teacher profile to an existing teacher account.
/// Admin only.
pub async fn create_teacher(
    State(repo): State<Arc<dyn ExamRepository>>,
    Json(payload): Json<CreateTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_account(repo.as_ref(), payload.user_id, Role::Teacher).await?;

    let teacher = repo.create_teacher(&payload).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

/// Attaches a student profile to an existing student account.
/// Admin only.
pub async fn create_student(
    State(repo): State<Arc<dyn ExamRepository>>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_account(repo.as_ref(), payload.user_id, Role::Student).await?;

    let student = repo.create_student(&payload).await?;
    Ok((StatusCode::CREATED, Json(student)))
}
