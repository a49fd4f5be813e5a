// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exams' table joined with its student assignments.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,

    /// Owning teacher profile. Fixed at creation.
    pub teacher_id: i64,

    pub title: String,

    /// Time allowed between session start and submission.
    pub duration_minutes: i32,

    /// Student profile ids, ascending and without duplicates.
    pub assigned_students: Vec<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Exam {
    pub fn is_assigned(&self, student_id: i64) -> bool {
        self.assigned_students.binary_search(&student_id).is_ok()
    }
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title length must be between 1 and 100 chars"
    ))]
    pub title: String,
    #[validate(range(min = 1, message = "duration_minutes must be a positive integer"))]
    pub duration_minutes: i32,
}

/// DTO for editing exam metadata. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(range(min = 1, message = "duration_minutes must be a positive integer"))]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignStudentsRequest {
    #[validate(length(min = 1, message = "student_ids cannot be empty"))]
    pub student_ids: Vec<i64>,
}
