// src/services/questions.rs

use std::collections::BTreeSet;

use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        BulkQuestionItem, CreateQuestionRequest, PublicQuestion, Question, UpdateQuestionRequest,
    },
    repository::ExamRepository,
    services::{
        access::{self, Actor, Caller},
        exams::load_exam,
    },
    utils::html::clean_required,
};

fn sanitize(q: CreateQuestionRequest) -> Result<CreateQuestionRequest, AppError> {
    Ok(CreateQuestionRequest {
        question_text: clean_required("question_text", &q.question_text)?,
        option_a: clean_required("option_a", &q.option_a)?,
        option_b: clean_required("option_b", &q.option_b)?,
        option_c: clean_required("option_c", &q.option_c)?,
        option_d: clean_required("option_d", &q.option_d)?,
        correct_option: q.correct_option,
    })
}

fn sanitize_optional(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    value.map(|v| clean_required(field, &v)).transpose()
}

/// Owner check + cap-enforcing insert shared by the single and bulk paths.
async fn add_to_exam(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
    questions: Vec<CreateQuestionRequest>,
) -> Result<Vec<Question>, AppError> {
    let actor = Actor::Teacher(access::teacher_profile(repo, caller).await?);
    let exam = load_exam(repo, exam_id).await?;
    access::require_owner(&actor, &exam)?;

    let questions = questions
        .into_iter()
        .map(sanitize)
        .collect::<Result<Vec<_>, _>>()?;

    let created = repo.add_questions(exam.id, &questions).await?;
    tracing::info!("Added {} question(s) to exam {}", created.len(), exam.id);
    Ok(created)
}

/// Adds one question. The exam must hold fewer than five.
pub async fn add_question(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
    req: CreateQuestionRequest,
) -> Result<Question, AppError> {
    req.validate()?;
    add_to_exam(repo, caller, exam_id, vec![req])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Question insert returned no row".to_string()))
}

/// Adds a batch of questions to a single exam, all or nothing.
pub async fn add_questions_bulk(
    repo: &dyn ExamRepository,
    caller: Caller,
    items: Vec<BulkQuestionItem>,
) -> Result<Vec<Question>, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Expected a list of questions.".to_string()));
    }
    for item in &items {
        item.validate()?;
    }

    let exam_ids: BTreeSet<i64> = items.iter().map(|item| item.exam).collect();
    let exam_id = match exam_ids.iter().next() {
        Some(&id) if exam_ids.len() == 1 => id,
        _ => return Err(AppError::InconsistentBatch),
    };

    let questions = items.into_iter().map(|item| item.question).collect();
    add_to_exam(repo, caller, exam_id, questions).await
}

/// Full questions, including the correct option. Owner only.
pub async fn list_questions(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
) -> Result<Vec<Question>, AppError> {
    let actor = Actor::Teacher(access::teacher_profile(repo, caller).await?);
    let exam = load_exam(repo, exam_id).await?;
    access::require_owner(&actor, &exam)?;

    repo.list_questions(exam.id).await
}

/// The question sheet an assigned student answers, without correct options.
pub async fn exam_paper(
    repo: &dyn ExamRepository,
    caller: Caller,
    exam_id: i64,
) -> Result<Vec<PublicQuestion>, AppError> {
    let actor = Actor::Student(access::student_profile(repo, caller).await?);
    let exam = load_exam(repo, exam_id).await?;
    if !access::can_submit(&actor, &exam) {
        return Err(AppError::PermissionDenied(
            "You are not assigned to this exam.".to_string(),
        ));
    }

    let questions = repo.list_questions(exam.id).await?;
    Ok(questions.into_iter().map(PublicQuestion::from).collect())
}

/// Loads a question and checks the caller owns its exam.
async fn owned_question(
    repo: &dyn ExamRepository,
    caller: Caller,
    question_id: i64,
) -> Result<Question, AppError> {
    let actor = Actor::Teacher(access::teacher_profile(repo, caller).await?);
    let question = repo
        .find_question(question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    let exam = load_exam(repo, question.exam_id).await?;
    access::require_owner(&actor, &exam)?;
    Ok(question)
}

pub async fn update_question(
    repo: &dyn ExamRepository,
    caller: Caller,
    question_id: i64,
    patch: UpdateQuestionRequest,
) -> Result<Question, AppError> {
    patch.validate()?;
    let question = owned_question(repo, caller, question_id).await?;

    let patch = UpdateQuestionRequest {
        question_text: sanitize_optional("question_text", patch.question_text)?,
        option_a: sanitize_optional("option_a", patch.option_a)?,
        option_b: sanitize_optional("option_b", patch.option_b)?,
        option_c: sanitize_optional("option_c", patch.option_c)?,
        option_d: sanitize_optional("option_d", patch.option_d)?,
        correct_option: patch.correct_option,
    };
    repo.update_question(question.id, &patch).await
}

pub async fn delete_question(
    repo: &dyn ExamRepository,
    caller: Caller,
    question_id: i64,
) -> Result<(), AppError> {
    let question = owned_question(repo, caller, question_id).await?;
    if !repo.delete_question(question.id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    Ok(())
}
