// tests/postgres_tests.rs

//! Repository tests against a live Postgres. They run only when
//! `DATABASE_URL` is set and are skipped otherwise.

use chrono::{Duration, Utc};
use school_exams::{
    config::MAX_QUESTIONS_PER_EXAM,
    error::AppError,
    models::{
        exam::Exam,
        profile::{CreateStudentRequest, CreateTeacherRequest, Student},
        question::{Choice, CreateQuestionRequest, UpdateQuestionRequest},
        session::{AnswerInput, NewSession},
        user::Role,
    },
    repository::{ExamRepository, PgRepository},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Connects and migrates, or returns `None` when no database is configured.
async fn connect() -> Option<(PgRepository, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some((PgRepository::new(pool.clone()), pool))
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

fn question(text: &str, correct: Choice) -> CreateQuestionRequest {
    CreateQuestionRequest {
        question_text: text.to_string(),
        option_a: "3".to_string(),
        option_b: "4".to_string(),
        option_c: "5".to_string(),
        option_d: "6".to_string(),
        correct_option: correct,
    }
}

async fn exam(repo: &PgRepository, duration_minutes: i32) -> Exam {
    let user = repo
        .create_user(&unique("t"), "hash", Role::Teacher)
        .await
        .unwrap();
    let teacher = repo
        .create_teacher(&CreateTeacherRequest {
            user_id: user.id,
            employee_id: unique("E"),
            subject_specialization: String::new(),
        })
        .await
        .unwrap();
    repo.create_exam(teacher.id, "Math Exam", duration_minutes)
        .await
        .unwrap()
}

async fn student(repo: &PgRepository) -> Student {
    let user = repo
        .create_user(&unique("s"), "hash", Role::Student)
        .await
        .unwrap();
    repo.create_student(&CreateStudentRequest {
        user_id: user.id,
        roll_number: unique("R"),
        grade: "10".to_string(),
    })
    .await
    .unwrap()
}

async fn answers_for_exam(pool: &PgPool, exam_id: i64) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM student_answers a \
         JOIN exam_sessions s ON s.id = a.session_id WHERE s.exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn sixth_question_is_refused() {
    let Some((repo, _pool)) = connect().await else {
        return;
    };
    let exam = exam(&repo, 30).await;

    for i in 0..MAX_QUESTIONS_PER_EXAM {
        repo.add_questions(exam.id, &[question(&format!("Q{}", i), Choice::A)])
            .await
            .unwrap();
    }

    let err = repo
        .add_questions(exam.id, &[question("Q6", Choice::B)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));
    assert_eq!(
        repo.list_questions(exam.id).await.unwrap().len(),
        MAX_QUESTIONS_PER_EXAM
    );
}

#[tokio::test]
async fn over_capacity_batch_inserts_nothing() {
    let Some((repo, _pool)) = connect().await else {
        return;
    };
    let exam = exam(&repo, 30).await;
    repo.add_questions(exam.id, &[question("Q0", Choice::A)])
        .await
        .unwrap();

    let batch: Vec<_> = (1..=MAX_QUESTIONS_PER_EXAM)
        .map(|i| question(&format!("Q{}", i), Choice::C))
        .collect();
    let err = repo.add_questions(exam.id, &batch).await.unwrap_err();
    assert_eq!(
        err,
        AppError::CapacityExceeded("Only 4 more question(s) allowed for this exam.".into())
    );

    let stored = repo.list_questions(exam.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].question_text, "Q0");
}

#[tokio::test]
async fn foreign_question_rolls_back_the_session() {
    let Some((repo, pool)) = connect().await else {
        return;
    };
    let exam_a = exam(&repo, 30).await;
    let exam_b = exam(&repo, 30).await;
    let own = repo
        .add_questions(exam_a.id, &[question("Q1", Choice::B)])
        .await
        .unwrap();
    let foreign = repo
        .add_questions(exam_b.id, &[question("Q2", Choice::C)])
        .await
        .unwrap();
    let student = student(&repo).await;
    let now = Utc::now();

    let err = repo
        .record_submission(&NewSession {
            student_id: student.id,
            exam_id: exam_a.id,
            start_time: now,
            end_time: now,
            answers: vec![
                AnswerInput {
                    question: own[0].id,
                    selected_option: Choice::B,
                },
                AnswerInput {
                    question: foreign[0].id,
                    selected_option: Choice::C,
                },
            ],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuestionReference(_)));

    assert!(repo.list_sessions_for_exam(exam_a.id).await.unwrap().is_empty());
    assert!(
        repo.list_sessions_for_student(student.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(answers_for_exam(&pool, exam_a.id).await, 0);
}

#[tokio::test]
async fn late_submission_writes_nothing() {
    let Some((repo, pool)) = connect().await else {
        return;
    };
    let exam = exam(&repo, 1).await;
    let questions = repo
        .add_questions(exam.id, &[question("Q1", Choice::B)])
        .await
        .unwrap();
    let student = student(&repo).await;
    let start = Utc::now() - Duration::minutes(5);

    let err = repo
        .record_submission(&NewSession {
            student_id: student.id,
            exam_id: exam.id,
            start_time: start,
            end_time: start + Duration::minutes(2),
            answers: vec![AnswerInput {
                question: questions[0].id,
                selected_option: Choice::B,
            }],
        })
        .await
        .unwrap_err();
    assert_eq!(err, AppError::ExamTimeExceeded);
    assert!(repo.list_sessions_for_exam(exam.id).await.unwrap().is_empty());
    assert_eq!(answers_for_exam(&pool, exam.id).await, 0);
}

#[tokio::test]
async fn submission_is_scored_from_stored_answers() {
    let Some((repo, pool)) = connect().await else {
        return;
    };
    let exam = exam(&repo, 30).await;
    let questions = repo
        .add_questions(
            exam.id,
            &[question("Q1", Choice::B), question("Q2", Choice::A)],
        )
        .await
        .unwrap();
    let student = student(&repo).await;
    let now = Utc::now();

    let detail = repo
        .record_submission(&NewSession {
            student_id: student.id,
            exam_id: exam.id,
            start_time: now,
            end_time: now,
            answers: vec![
                AnswerInput {
                    question: questions[0].id,
                    selected_option: Choice::B,
                },
                AnswerInput {
                    question: questions[1].id,
                    selected_option: Choice::D,
                },
            ],
        })
        .await
        .unwrap();
    assert_eq!(detail.session.score, Some(1));
    assert!(detail.session.submitted);
    assert_eq!(detail.answers.len(), 2);
    assert_eq!(answers_for_exam(&pool, exam.id).await, 2);

    let stored = repo.find_session(detail.session.id).await.unwrap().unwrap();
    assert_eq!(stored.session.score, Some(1));
}

#[tokio::test]
async fn questions_are_frozen_after_a_submission() {
    let Some((repo, _pool)) = connect().await else {
        return;
    };
    let exam = exam(&repo, 30).await;
    let questions = repo
        .add_questions(
            exam.id,
            &[question("Q1", Choice::B), question("Q2", Choice::A)],
        )
        .await
        .unwrap();

    // Before any session the key can still change, one field at a time.
    let updated = repo
        .update_question(
            questions[0].id,
            &UpdateQuestionRequest {
                correct_option: Some(Choice::C),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.correct_option, Choice::C);
    assert_eq!(updated.question_text, "Q1");

    let student = student(&repo).await;
    let now = Utc::now();
    repo.record_submission(&NewSession {
        student_id: student.id,
        exam_id: exam.id,
        start_time: now,
        end_time: now,
        answers: vec![AnswerInput {
            question: questions[0].id,
            selected_option: Choice::C,
        }],
    })
    .await
    .unwrap();

    let err = repo
        .update_question(
            questions[0].id,
            &UpdateQuestionRequest {
                correct_option: Some(Choice::A),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = repo.delete_question(questions[1].id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = repo.list_questions(exam.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].correct_option, Choice::C);
    assert!(!repo.delete_question(i64::MAX).await.unwrap());
}

#[tokio::test]
async fn assignment_is_idempotent() {
    let Some((repo, _pool)) = connect().await else {
        return;
    };
    let exam = exam(&repo, 30).await;
    let first = student(&repo).await;
    let second = student(&repo).await;

    repo.assign_students(exam.id, &[first.id]).await.unwrap();
    let assigned = repo
        .assign_students(exam.id, &[first.id, second.id, first.id])
        .await
        .unwrap();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(assigned.assigned_students, expected);

    let err = repo
        .assign_students(exam.id, &[i64::MAX])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let reloaded = repo.find_exam(exam.id).await.unwrap().unwrap();
    assert_eq!(reloaded.assigned_students, expected);
}
