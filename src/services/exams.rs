// src/services/exams.rs

use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{AssignStudentsRequest, CreateExamRequest, Exam, UpdateExamRequest},
    repository::ExamRepository,
    services::access::{self, Actor, Caller},
    utils::html::clean_required,
};

/// Loads an exam or fails with `NotFound`.
pub async fn load_exam(repo: &dyn ExamRepository, exam_id: i64) -> Result<Exam, AppError> {
    repo.find_exam(exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
}

/// Creates an exam owned by the calling teacher.
pub async fn create_exam(
    repo: &dyn ExamRepository,
    caller: Caller,
    req: CreateExamRequest,
) -> Result<Exam, AppError> {
    req.validate()?;
    let teacher = access::teacher_profile(repo, caller).await?;
    let title = clean_required("title", &req.title)?;

    let exam = repo
        .create_exam(teacher.id, &title, req.duration_minutes)
        .await?;
    tracing::info!("Teacher {} created exam {} ({})", teacher.id, exam.id, exam.title);
    Ok(exam)
}

/// Teachers see the exams they own; admins see every exam.
pub async fn list_exams(repo: &dyn ExamRepository, caller: Caller) -> Result<Vec<Exam>, AppError> {
    match access::resolve(repo, caller).await? {
        Actor::Admin => repo.list_exams().await,
        Actor::Teacher(teacher) => repo.list_exams_for_teacher(teacher.id).await,
        Actor::Student(_) => Err(AppError::PermissionDenied(
            "Students list their exams through /exams/assigned".to_string(),
        )),
    }
}

/// Exams the calling student is assigned to.
pub async fn list_assigned(
    repo: &dyn ExamRepository,
    caller: Caller,
) -> Result<Vec<Exam>, AppError> {
    let student = access::student_profile(repo, caller).await?;
    repo.list_exams_for_student(student.id).await
}

pub async fn get_exam(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
) -> Result<Exam, AppError> {
    let actor = access::resolve(repo, caller).await?;
    let exam = load_exam(repo, exam_id).await?;
    if !access::can_view_exam(&actor, &exam) {
        return Err(AppError::PermissionDenied(
            "You do not have access to this exam.".to_string(),
        ));
    }
    Ok(exam)
}

pub async fn update_exam(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
    req: UpdateExamRequest,
) -> Result<Exam, AppError> {
    req.validate()?;
    let actor = Actor::Teacher(access::teacher_profile(repo, caller).await?);
    let exam = load_exam(repo, exam_id).await?;
    access::require_owner(&actor, &exam)?;

    let title = req
        .title
        .as_deref()
        .map(|title| clean_required("title", title))
        .transpose()?;

    repo.update_exam(exam.id, title.as_deref(), req.duration_minutes)
        .await
}

/// Deletes the exam with its questions and sessions. Owner or admin only.
pub async fn delete_exam(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
) -> Result<(), AppError> {
    let actor = access::resolve(repo, caller).await?;
    let exam = load_exam(repo, exam_id).await?;
    if !access::can_delete_exam(&actor, &exam) {
        return Err(AppError::NotOwner(
            "You are not the teacher of this exam.".to_string(),
        ));
    }

    if !repo.delete_exam(exam.id).await? {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }
    tracing::info!("Exam {} deleted by user {}", exam.id, caller.user_id);
    Ok(())
}

/// Adds students to the exam. Re-assigning a student is a no-op.
pub async fn assign_students(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
    req: AssignStudentsRequest,
) -> Result<Exam, AppError> {
    req.validate()?;
    let actor = Actor::Teacher(access::teacher_profile(repo, caller).await?);
    let exam = load_exam(repo, exam_id).await?;
    access::require_owner(&actor, &exam)?;

    repo.assign_students(exam.id, &req.student_ids).await
}
