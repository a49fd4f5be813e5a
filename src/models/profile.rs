// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'teachers' table: the domain profile behind a teacher account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub user_id: i64,
    pub employee_id: String,
    pub subject_specialization: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'students' table: the domain profile behind a student account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub roll_number: String,
    pub grade: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeacherRequest {
    pub user_id: i64,
    #[validate(length(min = 1, max = 20))]
    pub employee_id: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub subject_specialization: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    pub user_id: i64,
    #[validate(length(min = 1, max = 20))]
    pub roll_number: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub grade: String,
}
