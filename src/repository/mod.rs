// src/repository/mod.rs

//! Persistence boundary for the exam service.
//!
//! Every method that writes more than one row is atomic: either all rows are
//! committed or none are.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        profile::{CreateStudentRequest, CreateTeacherRequest, Student, Teacher},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        session::{ExamSession, NewSession, SessionDetail},
        user::{Role, User},
    },
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

pub(crate) const QUESTIONS_LOCKED: &str =
    "Questions cannot be changed once the exam has submissions.";

#[async_trait]
pub trait ExamRepository: Send + Sync {
    // Accounts and profiles

    /// Fails with `Conflict` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn create_teacher(&self, req: &CreateTeacherRequest) -> Result<Teacher, AppError>;
    async fn create_student(&self, req: &CreateStudentRequest) -> Result<Student, AppError>;
    async fn teacher_by_user(&self, user_id: i64) -> Result<Option<Teacher>, AppError>;
    async fn student_by_user(&self, user_id: i64) -> Result<Option<Student>, AppError>;

    // Exams

    async fn create_exam(
        &self,
        teacher_id: i64,
        title: &str,
        duration_minutes: i32,
    ) -> Result<Exam, AppError>;
    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError>;
    /// `None` leaves the field unchanged. Fails with `NotFound` for an unknown exam.
    async fn update_exam(
        &self,
        id: i64,
        title: Option<&str>,
        duration_minutes: Option<i32>,
    ) -> Result<Exam, AppError>;
    /// Removes the exam with its questions, assignments, sessions and answers.
    /// Returns false if the exam did not exist.
    async fn delete_exam(&self, id: i64) -> Result<bool, AppError>;
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError>;
    async fn list_exams_for_teacher(&self, teacher_id: i64) -> Result<Vec<Exam>, AppError>;
    async fn list_exams_for_student(&self, student_id: i64) -> Result<Vec<Exam>, AppError>;
    /// Adds the students to the exam; already-assigned ids are skipped.
    /// Fails with `NotFound` (assigning nothing) if any id is not a student profile.
    async fn assign_students(&self, exam_id: i64, student_ids: &[i64]) -> Result<Exam, AppError>;

    // Question bank

    /// Inserts all questions or none. Fails with `CapacityExceeded` when the
    /// exam would end up holding more than `MAX_QUESTIONS_PER_EXAM` questions.
    async fn add_questions(
        &self,
        exam_id: i64,
        questions: &[CreateQuestionRequest],
    ) -> Result<Vec<Question>, AppError>;
    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>, AppError>;
    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError>;
    /// Fails with `Conflict` once the question's exam has any session.
    async fn update_question(
        &self,
        id: i64,
        patch: &UpdateQuestionRequest,
    ) -> Result<Question, AppError>;
    /// Fails with `Conflict` once the question's exam has any session.
    async fn delete_question(&self, id: i64) -> Result<bool, AppError>;

    // Sessions

    /// Writes the session and all of its answers in one transaction.
    ///
    /// The deadline is checked against the exam's current duration and the
    /// score is counted from the question rows read inside that same write.
    /// Fails with `ExamTimeExceeded` or `InvalidQuestionReference` without
    /// writing anything.
    async fn record_submission(&self, submission: &NewSession) -> Result<SessionDetail, AppError>;
    async fn find_session(&self, id: i64) -> Result<Option<SessionDetail>, AppError>;
    async fn list_sessions_for_student(&self, student_id: i64)
    -> Result<Vec<ExamSession>, AppError>;
    async fn list_sessions_for_exam(&self, exam_id: i64) -> Result<Vec<ExamSession>, AppError>;
}
