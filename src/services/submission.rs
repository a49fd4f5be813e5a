// src/services/submission.rs

//! Scoring and time-window checks for one-shot exam submissions.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::session::{ExamSession, NewSession, SessionDetail, SubmitExamRequest},
    repository::ExamRepository,
    services::{
        access::{self, Actor, Caller},
        exams::load_exam,
    },
    utils::clock::Clock,
};

/// Falls back to `now` when the client sends no start time.
pub fn resolve_start(
    supplied: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AppError> {
    match supplied {
        Some(start) if start > now => Err(AppError::BadRequest(
            "start_time cannot be in the future.".to_string(),
        )),
        Some(start) => Ok(start),
        None => Ok(now),
    }
}

/// Records a submission. The deadline check and scoring run inside the
/// repository write, against the exam as it stands at commit time.
/// Nothing is written on failure.
pub async fn submit(
    repo: &dyn ExamRepository,
    clock: &dyn Clock,
    caller: Caller,
    req: SubmitExamRequest,
) -> Result<SessionDetail, AppError> {
    let student = access::student_profile(repo, caller).await?;
    let student_id = student.id;
    let exam = load_exam(repo, req.exam).await?;
    if !access::can_submit(&Actor::Student(student), &exam) {
        return Err(AppError::PermissionDenied(
            "You are not assigned to this exam.".to_string(),
        ));
    }

    let now = clock.now();
    let start_time = resolve_start(req.start_time, now)?;

    let detail = repo
        .record_submission(&NewSession {
            student_id,
            exam_id: exam.id,
            start_time,
            end_time: now,
            answers: req.answers,
        })
        .await
        .inspect_err(|err| {
            if *err == AppError::ExamTimeExceeded {
                tracing::warn!(
                    "Late submission rejected: student {} exam {} started {}",
                    student_id,
                    exam.id,
                    start_time
                );
            }
        })?;

    tracing::info!(
        "Student {} submitted exam {}: score {} over {} answer(s)",
        student_id,
        exam.id,
        detail.session.score.unwrap_or_default(),
        detail.answers.len()
    );
    Ok(detail)
}

/// The calling student's sessions, newest first.
pub async fn list_my_sessions(
    repo: &dyn ExamRepository,
    caller: Caller,
) -> Result<Vec<ExamSession>, AppError> {
    let student = access::student_profile(repo, caller).await?;
    repo.list_sessions_for_student(student.id).await
}

/// All sessions of an exam. Owner or admin only.
pub async fn list_exam_sessions(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
) -> Result<Vec<ExamSession>, AppError> {
    let actor = access::resolve(repo, caller).await?;
    let exam = load_exam(repo, exam_id).await?;
    if !access::can_delete_exam(&actor, &exam) {
        return Err(AppError::NotOwner(
            "You are not the teacher of this exam.".to_string(),
        ));
    }
    repo.list_sessions_for_exam(exam.id).await
}

pub async fn get_session(
    repo: &dyn ExamRepository,
    caller: Caller,
    session_id: i64,
) -> Result<SessionDetail, AppError> {
    let actor = access::resolve(repo, caller).await?;
    let detail = repo
        .find_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    let exam = load_exam(repo, detail.session.exam_id).await?;
    if !access::can_view_session(&actor, &exam, &detail.session) {
        return Err(AppError::PermissionDenied(
            "You do not have access to this session.".to_string(),
        ));
    }
    Ok(detail)
}
