// src/repository/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

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

/// Process-local repository. All state lives behind one lock, so every
/// method observes and leaves a consistent snapshot.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    teachers: BTreeMap<i64, Teacher>,
    students: BTreeMap<i64, Student>,
    exams: BTreeMap<i64, Exam>,
    questions: BTreeMap<i64, Question>,
    sessions: BTreeMap<i64, ExamSession>,
    answers: BTreeMap<i64, Answer>,
}

#[derive(Default)]
struct Sequences {
    users: i64,
    teachers: i64,
    students: i64,
    exams: i64,
    questions: i64,
    sessions: i64,
    answers: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored answers across all sessions.
    pub async fn answer_count(&self) -> usize {
        self.tables.read().await.answers.len()
    }
}

impl Tables {
    fn exam(&self, id: i64) -> Result<&Exam, AppError> {
        self.exams
            .get(&id)
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
    }

    /// Questions of an exam that already has sessions are frozen.
    fn ensure_questions_editable(&self, exam_id: i64) -> Result<(), AppError> {
        if self.sessions.values().any(|s| s.exam_id == exam_id) {
            return Err(AppError::Conflict(QUESTIONS_LOCKED.to_string()));
        }
        Ok(())
    }

    fn question_count(&self, exam_id: i64) -> usize {
        self.questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .count()
    }

    fn session_detail(&self, session: &ExamSession) -> SessionDetail {
        let answers = self
            .answers
            .values()
            .filter(|a| a.session_id == session.id)
            .cloned()
            .collect();
        SessionDetail {
            session: session.clone(),
            answers,
        }
    }
}

#[async_trait]
impl ExamRepository for MemoryRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        let user = User {
            id: next_id(&mut t.seq.users),
            username: username.to_string(),
            password: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.tables.read().await.users.values().rev().cloned().collect())
    }

    async fn create_teacher(&self, req: &CreateTeacherRequest) -> Result<Teacher, AppError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&req.user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if t.teachers
            .values()
            .any(|p| p.user_id == req.user_id || p.employee_id == req.employee_id)
        {
            return Err(AppError::Conflict(
                "Teacher profile already exists for this user or employee id".to_string(),
            ));
        }

        let teacher = Teacher {
            id: next_id(&mut t.seq.teachers),
            user_id: req.user_id,
            employee_id: req.employee_id.clone(),
            subject_specialization: req.subject_specialization.clone(),
            created_at: Utc::now(),
        };
        t.teachers.insert(teacher.id, teacher.clone());
        Ok(teacher)
    }

    async fn create_student(&self, req: &CreateStudentRequest) -> Result<Student, AppError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&req.user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if t.students
            .values()
            .any(|p| p.user_id == req.user_id || p.roll_number == req.roll_number)
        {
            return Err(AppError::Conflict(
                "Student profile already exists for this user or roll number".to_string(),
            ));
        }

        let student = Student {
            id: next_id(&mut t.seq.students),
            user_id: req.user_id,
            roll_number: req.roll_number.clone(),
            grade: req.grade.clone(),
            created_at: Utc::now(),
        };
        t.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn teacher_by_user(&self, user_id: i64) -> Result<Option<Teacher>, AppError> {
        let t = self.tables.read().await;
        Ok(t.teachers.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn student_by_user(&self, user_id: i64) -> Result<Option<Student>, AppError> {
        let t = self.tables.read().await;
        Ok(t.students.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn create_exam(
        &self,
        teacher_id: i64,
        title: &str,
        duration_minutes: i32,
    ) -> Result<Exam, AppError> {
        let mut t = self.tables.write().await;
        if !t.teachers.contains_key(&teacher_id) {
            return Err(AppError::ProfileNotFound(
                "Teacher profile not found".to_string(),
            ));
        }

        let exam = Exam {
            id: next_id(&mut t.seq.exams),
            teacher_id,
            title: title.to_string(),
            duration_minutes,
            assigned_students: Vec::new(),
            created_at: Utc::now(),
        };
        t.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.tables.read().await.exams.get(&id).cloned())
    }

    async fn update_exam(
        &self,
        id: i64,
        title: Option<&str>,
        duration_minutes: Option<i32>,
    ) -> Result<Exam, AppError> {
        let mut t = self.tables.write().await;
        let exam = t
            .exams
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

        if let Some(title) = title {
            exam.title = title.to_string();
        }
        if let Some(duration) = duration_minutes {
            exam.duration_minutes = duration;
        }
        Ok(exam.clone())
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        if t.exams.remove(&id).is_none() {
            return Ok(false);
        }

        t.questions.retain(|_, q| q.exam_id != id);
        let removed_sessions: Vec<i64> = t
            .sessions
            .values()
            .filter(|s| s.exam_id == id)
            .map(|s| s.id)
            .collect();
        t.sessions.retain(|_, s| s.exam_id != id);
        t.answers
            .retain(|_, a| !removed_sessions.contains(&a.session_id));
        Ok(true)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        Ok(self.tables.read().await.exams.values().cloned().collect())
    }

    async fn list_exams_for_teacher(&self, teacher_id: i64) -> Result<Vec<Exam>, AppError> {
        let t = self.tables.read().await;
        Ok(t.exams
            .values()
            .filter(|e| e.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn list_exams_for_student(&self, student_id: i64) -> Result<Vec<Exam>, AppError> {
        let t = self.tables.read().await;
        Ok(t.exams
            .values()
            .filter(|e| e.is_assigned(student_id))
            .cloned()
            .collect())
    }

    async fn assign_students(&self, exam_id: i64, student_ids: &[i64]) -> Result<Exam, AppError> {
        let mut t = self.tables.write().await;
        t.exam(exam_id)?;
        if let Some(missing) = student_ids.iter().find(|&&id| !t.students.contains_key(&id)) {
            return Err(AppError::NotFound(format!("Student {} not found", missing)));
        }

        let exam = t
            .exams
            .get_mut(&exam_id)
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;
        exam.assigned_students.extend_from_slice(student_ids);
        exam.assigned_students.sort_unstable();
        exam.assigned_students.dedup();
        Ok(exam.clone())
    }

    async fn add_questions(
        &self,
        exam_id: i64,
        questions: &[CreateQuestionRequest],
    ) -> Result<Vec<Question>, AppError> {
        let mut t = self.tables.write().await;
        t.exam(exam_id)?;

        let existing = t.question_count(exam_id);
        if existing + questions.len() > MAX_QUESTIONS_PER_EXAM {
            return Err(AppError::capacity_exceeded(existing));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(questions.len());
        for q in questions {
            let question = Question {
                id: next_id(&mut t.seq.questions),
                exam_id,
                question_text: q.question_text.clone(),
                option_a: q.option_a.clone(),
                option_b: q.option_b.clone(),
                option_c: q.option_c.clone(),
                option_d: q.option_d.clone(),
                correct_option: q.correct_option,
                created_at: now,
            };
            t.questions.insert(question.id, question.clone());
            created.push(question);
        }
        Ok(created)
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>, AppError> {
        let t = self.tables.read().await;
        Ok(t.questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn update_question(
        &self,
        id: i64,
        patch: &UpdateQuestionRequest,
    ) -> Result<Question, AppError> {
        let mut t = self.tables.write().await;
        let exam_id = t
            .questions
            .get(&id)
            .map(|q| q.exam_id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        t.ensure_questions_editable(exam_id)?;

        let question = t
            .questions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        if let Some(text) = &patch.question_text {
            question.question_text = text.clone();
        }
        if let Some(option) = &patch.option_a {
            question.option_a = option.clone();
        }
        if let Some(option) = &patch.option_b {
            question.option_b = option.clone();
        }
        if let Some(option) = &patch.option_c {
            question.option_c = option.clone();
        }
        if let Some(option) = &patch.option_d {
            question.option_d = option.clone();
        }
        if let Some(correct) = patch.correct_option {
            question.correct_option = correct;
        }
        Ok(question.clone())
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        let Some(exam_id) = t.questions.get(&id).map(|q| q.exam_id) else {
            return Ok(false);
        };
        t.ensure_questions_editable(exam_id)?;

        t.questions.remove(&id);
        Ok(true)
    }

    async fn record_submission(&self, submission: &NewSession) -> Result<SessionDetail, AppError> {
        let mut t = self.tables.write().await;
        let duration = t.exam(submission.exam_id)?.duration_minutes;
        ensure_within_deadline(submission.start_time, duration, submission.end_time)?;

        let questions: Vec<Question> = t
            .questions
            .values()
            .filter(|q| q.exam_id == submission.exam_id)
            .cloned()
            .collect();
        let score = score_answers(&questions, &submission.answers)?;

        let session = ExamSession {
            id: next_id(&mut t.seq.sessions),
            student_id: submission.student_id,
            exam_id: submission.exam_id,
            start_time: submission.start_time,
            end_time: Some(submission.end_time),
            score: Some(score),
            submitted: true,
        };
        t.sessions.insert(session.id, session.clone());

        let mut answers = Vec::with_capacity(submission.answers.len());
        for input in &submission.answers {
            let answer = Answer {
                id: next_id(&mut t.seq.answers),
                session_id: session.id,
                question_id: input.question,
                selected_option: input.selected_option,
            };
            t.answers.insert(answer.id, answer.clone());
            answers.push(answer);
        }

        Ok(SessionDetail { session, answers })
    }

    async fn find_session(&self, id: i64) -> Result<Option<SessionDetail>, AppError> {
        let t = self.tables.read().await;
        Ok(t.sessions.get(&id).map(|s| t.session_detail(s)))
    }

    async fn list_sessions_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<ExamSession>, AppError> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .rev()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_sessions_for_exam(&self, exam_id: i64) -> Result<Vec<ExamSession>, AppError> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .rev()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect())
    }
}
