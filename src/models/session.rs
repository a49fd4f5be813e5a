// src/models/session.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::AppError,
    models::question::{Choice, Question},
};

/// Represents the 'exam_sessions' table: one student's attempt at one exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub start_time: DateTime<Utc>,

    /// Submission timestamp. Null until submitted.
    pub end_time: Option<DateTime<Utc>>,

    /// Number of correct answers. Null until submitted.
    pub score: Option<i32>,

    pub submitted: bool,
}

/// Represents the 'student_answers' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    #[sqlx(try_from = "String")]
    pub selected_option: Choice,
}

/// A session together with the answers recorded for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: ExamSession,
    pub answers: Vec<Answer>,
}

/// One submitted answer as sent by the client.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct AnswerInput {
    pub question: i64,
    pub selected_option: Choice,
}

/// DTO for submitting an exam in one shot.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    pub exam: i64,
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
    /// When the student opened the exam. Defaults to the time of submission.
    pub start_time: Option<DateTime<Utc>>,
}

/// A submission from an assigned student. The repository checks the deadline
/// and scores it against the question bank inside the same write that stores it.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub student_id: i64,
    pub exam_id: i64,
    pub start_time: DateTime<Utc>,
    /// Time of submission, read once from the clock.
    pub end_time: DateTime<Utc>,
    pub answers: Vec<AnswerInput>,
}

/// Latest instant at which a submission is still accepted.
pub fn deadline(start: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
    start + Duration::minutes(i64::from(duration_minutes))
}

/// Submitting exactly at the deadline is allowed.
pub fn ensure_within_deadline(
    start: DateTime<Utc>,
    duration_minutes: i32,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if now > deadline(start, duration_minutes) {
        return Err(AppError::ExamTimeExceeded);
    }
    Ok(())
}

/// Counts correct answers. Every answer must name a distinct question of the exam.
pub fn score_answers(questions: &[Question], answers: &[AnswerInput]) -> Result<i32, AppError> {
    let key: HashMap<i64, _> = questions
        .iter()
        .map(|q| (q.id, q.correct_option))
        .collect();
    let mut seen = HashSet::with_capacity(answers.len());
    let mut score = 0;

    for answer in answers {
        let correct = key.get(&answer.question).ok_or_else(|| {
            AppError::InvalidQuestionReference(format!(
                "Question {} does not belong to this exam.",
                answer.question
            ))
        })?;
        if !seen.insert(answer.question) {
            return Err(AppError::InvalidQuestionReference(format!(
                "Question {} is answered more than once.",
                answer.question
            )));
        }
        if *correct == answer.selected_option {
            score += 1;
        }
    }

    Ok(score)
}
