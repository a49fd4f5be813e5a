// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::LoginRequest,
    repository::ExamRepository,
    utils::{hash::verify_password, jwt::sign_jwt},
};

/// Authenticates a user and returns a JWT token.
///
/// Verifies the username and password against the stored Argon2 hash.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(repo): State<Arc<dyn ExamRepository>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!("Failed login for user '{}'", user.username);
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
    })))
}
