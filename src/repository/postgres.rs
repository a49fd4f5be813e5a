// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    config::MAX_QUESTIONS_PER_EXAM,
    error::AppError,
    models::{
        exam::Exam,
        profile::{CreateStudentRequest, CreateTeacherRequest, Student, Teacher},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        session::{
            Answer, ExamSession, NewSession, SessionDetail, ensure_within_deadline, score_answers,
        },
        user::{Role, User},
    },
    repository::{ExamRepository, QUESTIONS_LOCKED},
};

const USER_COLUMNS: &str = "id, username, password, role, created_at";

const TEACHER_COLUMNS: &str = "id, user_id, employee_id, subject_specialization, created_at";

const STUDENT_COLUMNS: &str = "id, user_id, roll_number, grade, created_at";

/// Exam columns over alias `e`, with the assignment set folded into a sorted array.
const EXAM_COLUMNS: &str = "\
    e.id, e.teacher_id, e.title, e.duration_minutes, \
    ARRAY(SELECT a.student_id FROM exam_assignments a \
          WHERE a.exam_id = e.id ORDER BY a.student_id) AS assigned_students, \
    e.created_at";

const QUESTION_COLUMNS: &str = "\
    id, exam_id, question_text, option_a, option_b, option_c, option_d, \
    correct_option, created_at";

const SESSION_COLUMNS: &str = "id, student_id, exam_id, start_time, end_time, score, submitted";

const ANSWER_COLUMNS: &str = "id, session_id, question_id, selected_option";

/// Postgres-backed repository.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps unique/foreign-key violations onto user-facing errors.
fn map_constraint_error(err: sqlx::Error, conflict: &str, missing: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(missing.to_string());
        }
    }
    tracing::error!("Database error: {:?}", err);
    AppError::InternalServerError(err.to_string())
}

/// Locks the question's exam and refuses once it has sessions.
/// `None` when the question does not exist.
async fn lock_editable_question(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    question_id: i64,
) -> Result<Option<i64>, AppError> {
    let exam_id: Option<i64> = sqlx::query_scalar(
        "SELECT e.id FROM exams e JOIN questions q ON q.exam_id = e.id \
         WHERE q.id = $1 FOR UPDATE OF e",
    )
    .bind(question_id)
    .fetch_optional(&mut **tx)
    .await?;
    let Some(exam_id) = exam_id else {
        return Ok(None);
    };

    let has_sessions: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exam_sessions WHERE exam_id = $1)")
            .bind(exam_id)
            .fetch_one(&mut **tx)
            .await?;
    if has_sessions {
        return Err(AppError::Conflict(QUESTIONS_LOCKED.to_string()));
    }
    Ok(Some(exam_id))
}

#[async_trait]
impl ExamRepository for PgRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_constraint_error(
                e,
                &format!("Username '{}' already exists", username),
                "User not found",
            )
        })
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_teacher(&self, req: &CreateTeacherRequest) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(&format!(
            "INSERT INTO teachers (user_id, employee_id, subject_specialization) \
             VALUES ($1, $2, $3) RETURNING {TEACHER_COLUMNS}"
        ))
        .bind(req.user_id)
        .bind(&req.employee_id)
        .bind(&req.subject_specialization)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_constraint_error(
                e,
                "Teacher profile already exists for this user or employee id",
                "User not found",
            )
        })
    }

    async fn create_student(&self, req: &CreateStudentRequest) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (user_id, roll_number, grade) \
             VALUES ($1, $2, $3) RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(req.user_id)
        .bind(&req.roll_number)
        .bind(&req.grade)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_constraint_error(
                e,
                "Student profile already exists for this user or roll number",
                "User not found",
            )
        })
    }

    async fn teacher_by_user(&self, user_id: i64) -> Result<Option<Teacher>, AppError> {
        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {TEACHER_COLUMNS} FROM teachers WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(teacher)
    }

    async fn student_by_user(&self, user_id: i64) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn create_exam(
        &self,
        teacher_id: i64,
        title: &str,
        duration_minutes: i32,
    ) -> Result<Exam, AppError> {
        sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (teacher_id, title, duration_minutes)
            VALUES ($1, $2, $3)
            RETURNING id, teacher_id, title, duration_minutes,
                      ARRAY[]::BIGINT[] AS assigned_students, created_at
            "#,
        )
        .bind(teacher_id)
        .bind(title)
        .bind(duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Exam already exists", "Teacher profile not found"))
    }

    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams e WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn update_exam(
        &self,
        id: i64,
        title: Option<&str>,
        duration_minutes: Option<i32>,
    ) -> Result<Exam, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE exams
            SET title = COALESCE($1, title),
                duration_minutes = COALESCE($2, duration_minutes)
            WHERE id = $3
            "#,
        )
        .bind(title)
        .bind(duration_minutes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }

        self.find_exam(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, AppError> {
        // Questions, assignments, sessions and answers go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete exam: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams e ORDER BY e.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn list_exams_for_teacher(&self, teacher_id: i64) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams e WHERE e.teacher_id = $1 ORDER BY e.id"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn list_exams_for_student(&self, student_id: i64) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams e \
             WHERE EXISTS (SELECT 1 FROM exam_assignments a \
                           WHERE a.exam_id = e.id AND a.student_id = $1) \
             ORDER BY e.id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn assign_students(&self, exam_id: i64, student_ids: &[i64]) -> Result<Exam, AppError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
            .bind(exam_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }

        let known: Vec<i64> = sqlx::query_scalar("SELECT id FROM students WHERE id = ANY($1)")
            .bind(student_ids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = student_ids.iter().find(|&&id| !known.contains(&id)) {
            return Err(AppError::NotFound(format!("Student {} not found", missing)));
        }

        sqlx::query(
            r#"
            INSERT INTO exam_assignments (exam_id, student_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT (exam_id, student_id) DO NOTHING
            "#,
        )
        .bind(exam_id)
        .bind(student_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_exam(exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
    }

    async fn add_questions(
        &self,
        exam_id: i64,
        questions: &[CreateQuestionRequest],
    ) -> Result<Vec<Question>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the exam serialises concurrent inserts against the cap.
        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
            .bind(exam_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
            .bind(exam_id)
            .fetch_one(&mut *tx)
            .await?;
        let existing = existing as usize;
        if existing + questions.len() > MAX_QUESTIONS_PER_EXAM {
            return Err(AppError::capacity_exceeded(existing));
        }

        let mut created = Vec::with_capacity(questions.len());
        for q in questions {
            let question = sqlx::query_as::<_, Question>(&format!(
                "INSERT INTO questions \
                 (exam_id, question_text, option_a, option_b, option_c, option_d, correct_option) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {QUESTION_COLUMNS}"
            ))
            .bind(exam_id)
            .bind(&q.question_text)
            .bind(&q.option_a)
            .bind(&q.option_b)
            .bind(&q.option_c)
            .bind(&q.option_d)
            .bind(q.correct_option.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create question: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;
            created.push(question);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY id"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn update_question(
        &self,
        id: i64,
        patch: &UpdateQuestionRequest,
    ) -> Result<Question, AppError> {
        let mut tx = self.pool.begin().await?;
        if lock_editable_question(&mut tx, id).await?.is_none() {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        if patch.is_empty() {
            return self
                .find_question(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Question not found".to_string()));
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        if let Some(text) = &patch.question_text {
            separated.push("question_text = ");
            separated.push_bind_unseparated(text.clone());
        }

        if let Some(option) = &patch.option_a {
            separated.push("option_a = ");
            separated.push_bind_unseparated(option.clone());
        }

        if let Some(option) = &patch.option_b {
            separated.push("option_b = ");
            separated.push_bind_unseparated(option.clone());
        }

        if let Some(option) = &patch.option_c {
            separated.push("option_c = ");
            separated.push_bind_unseparated(option.clone());
        }

        if let Some(option) = &patch.option_d {
            separated.push("option_d = ");
            separated.push_bind_unseparated(option.clone());
        }

        if let Some(correct) = patch.correct_option {
            separated.push("correct_option = ");
            separated.push_bind_unseparated(correct.as_str());
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {QUESTION_COLUMNS}"));

        let question = builder
            .build_query_as::<Question>()
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update question: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        tx.commit().await?;
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        if lock_editable_question(&mut tx, id).await?.is_none() {
            return Ok(false);
        }

        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_submission(&self, submission: &NewSession) -> Result<SessionDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        // Shared locks hold the duration and the answer key steady until commit.
        let duration: Option<i32> =
            sqlx::query_scalar("SELECT duration_minutes FROM exams WHERE id = $1 FOR SHARE")
                .bind(submission.exam_id)
                .fetch_optional(&mut *tx)
                .await?;
        let duration = duration.ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;
        ensure_within_deadline(submission.start_time, duration, submission.end_time)?;

        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY id FOR SHARE"
        ))
        .bind(submission.exam_id)
        .fetch_all(&mut *tx)
        .await?;
        let score = score_answers(&questions, &submission.answers)?;

        let session = sqlx::query_as::<_, ExamSession>(&format!(
            "INSERT INTO exam_sessions \
             (student_id, exam_id, start_time, end_time, score, submitted) \
             VALUES ($1, $2, $3, $4, $5, TRUE) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(submission.student_id)
        .bind(submission.exam_id)
        .bind(submission.start_time)
        .bind(submission.end_time)
        .bind(score)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Session already exists", "Exam not found"))?;

        let mut answers = Vec::with_capacity(submission.answers.len());
        for input in &submission.answers {
            let answer = sqlx::query_as::<_, Answer>(&format!(
                "INSERT INTO student_answers (session_id, question_id, selected_option) \
                 VALUES ($1, $2, $3) RETURNING {ANSWER_COLUMNS}"
            ))
            .bind(session.id)
            .bind(input.question)
            .bind(input.selected_option.as_str())
            .fetch_one(&mut *tx)
            .await?;
            answers.push(answer);
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit submission: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(SessionDetail { session, answers })
    }

    async fn find_session(&self, id: i64) -> Result<Option<SessionDetail>, AppError> {
        let session = sqlx::query_as::<_, ExamSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let answers = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM student_answers WHERE session_id = $1 ORDER BY id"
        ))
        .bind(session.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SessionDetail { session, answers }))
    }

    async fn list_sessions_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<ExamSession>, AppError> {
        let sessions = sqlx::query_as::<_, ExamSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE student_id = $1 ORDER BY id DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn list_sessions_for_exam(&self, exam_id: i64) -> Result<Vec<ExamSession>, AppError> {
        let sessions = sqlx::query_as::<_, ExamSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE exam_id = $1 ORDER BY id DESC"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }
}
