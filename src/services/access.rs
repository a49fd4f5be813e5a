// src/services/access.rs

//! Capability checks.
//!
//! A request is first reduced to a `Caller` (from the JWT), then resolved to an
//! `Actor` carrying the caller's domain profile. The predicates below decide
//! what an actor may do with an exam; they never touch storage.

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        profile::{Student, Teacher},
        session::ExamSession,
        user::Role,
    },
    repository::ExamRepository,
    utils::jwt::Claims,
};

/// Authenticated identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

impl TryFrom<&Claims> for Caller {
    type Error = AppError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;
        Ok(Self {
            user_id,
            role: claims.role,
        })
    }
}

/// A caller together with its domain profile.
#[derive(Debug, Clone)]
pub enum Actor {
    Admin,
    Teacher(Teacher),
    Student(Student),
}

pub async fn resolve(repo: &dyn ExamRepository, caller: Caller) -> Result<Actor, AppError> {
    match caller.role {
        Role::Admin => Ok(Actor::Admin),
        Role::Teacher => teacher_profile(repo, caller).await.map(Actor::Teacher),
        Role::Student => student_profile(repo, caller).await.map(Actor::Student),
    }
}

/// Teacher profile of the caller. Non-teachers get `PermissionDenied`,
/// teacher accounts without a profile get `ProfileNotFound`.
pub async fn teacher_profile(repo: &dyn ExamRepository, caller: Caller) -> Result<Teacher, AppError> {
    if caller.role != Role::Teacher {
        return Err(AppError::PermissionDenied(
            "Only teachers can perform this action".to_string(),
        ));
    }
    repo.teacher_by_user(caller.user_id).await?.ok_or_else(|| {
        AppError::ProfileNotFound("This user is not registered as a teacher.".to_string())
    })
}

/// Student profile of the caller. Same failure modes as `teacher_profile`.
pub async fn student_profile(repo: &dyn ExamRepository, caller: Caller) -> Result<Student, AppError> {
    if caller.role != Role::Student {
        return Err(AppError::PermissionDenied(
            "Only students can perform this action".to_string(),
        ));
    }
    repo.student_by_user(caller.user_id)
        .await?
        .ok_or_else(|| AppError::ProfileNotFound("Student profile not found".to_string()))
}

pub fn can_manage_exam(actor: &Actor, exam: &Exam) -> bool {
    matches!(actor, Actor::Teacher(teacher) if teacher.id == exam.teacher_id)
}

pub fn can_submit(actor: &Actor, exam: &Exam) -> bool {
    matches!(actor, Actor::Student(student) if exam.is_assigned(student.id))
}

pub fn can_view_exam(actor: &Actor, exam: &Exam) -> bool {
    matches!(actor, Actor::Admin) || can_manage_exam(actor, exam) || can_submit(actor, exam)
}

pub fn can_delete_exam(actor: &Actor, exam: &Exam) -> bool {
    matches!(actor, Actor::Admin) || can_manage_exam(actor, exam)
}

pub fn can_view_session(actor: &Actor, exam: &Exam, session: &ExamSession) -> bool {
    match actor {
        Actor::Admin => true,
        Actor::Teacher(_) => can_manage_exam(actor, exam),
        Actor::Student(student) => student.id == session.student_id,
    }
}

/// Fails with `NotOwner` unless the actor is the exam's teacher.
pub fn require_owner(actor: &Actor, exam: &Exam) -> Result<(), AppError> {
    if can_manage_exam(actor, exam) {
        Ok(())
    } else {
        Err(AppError::NotOwner(
            "You are not the teacher of this exam.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn teacher(id: i64) -> Actor {
        Actor::Teacher(Teacher {
            id,
            user_id: id + 100,
            employee_id: format!("T{}", id),
            subject_specialization: String::new(),
            created_at: Utc::now(),
        })
    }

    fn student(id: i64) -> Actor {
        Actor::Student(Student {
            id,
            user_id: id + 200,
            roll_number: format!("S{}", id),
            grade: "10".to_string(),
            created_at: Utc::now(),
        })
    }

    fn exam(teacher_id: i64, assigned: Vec<i64>) -> Exam {
        Exam {
            id: 1,
            teacher_id,
            title: "Math".to_string(),
            duration_minutes: 30,
            assigned_students: assigned,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_owning_teacher_manages() {
        let exam = exam(1, vec![]);
        assert!(can_manage_exam(&teacher(1), &exam));
        assert!(!can_manage_exam(&teacher(2), &exam));
        assert!(!can_manage_exam(&Actor::Admin, &exam));
        assert!(matches!(
            require_owner(&teacher(2), &exam),
            Err(AppError::NotOwner(_))
        ));
    }

    #[test]
    fn only_assigned_students_submit() {
        let exam = exam(1, vec![3, 5]);
        assert!(can_submit(&student(3), &exam));
        assert!(!can_submit(&student(4), &exam));
        assert!(!can_submit(&teacher(1), &exam));
    }

    #[test]
    fn admin_views_and_deletes_but_does_not_submit() {
        let exam = exam(1, vec![3]);
        let admin = Actor::Admin;
        assert!(can_view_exam(&admin, &exam));
        assert!(can_delete_exam(&admin, &exam));
        assert!(!can_submit(&admin, &exam));
        assert!(!can_delete_exam(&student(3), &exam));
    }

    #[test]
    fn students_see_only_their_own_sessions() {
        let exam = exam(1, vec![3, 4]);
        let session = ExamSession {
            id: 1,
            student_id: 3,
            exam_id: exam.id,
            start_time: Utc::now(),
            end_time: None,
            score: None,
            submitted: false,
        };
        assert!(can_view_session(&student(3), &exam, &session));
        assert!(!can_view_session(&student(4), &exam, &session));
        assert!(can_view_session(&teacher(1), &exam, &session));
        assert!(!can_view_session(&teacher(2), &exam, &session));
    }

    #[test]
    fn caller_requires_numeric_subject() {
        let claims = Claims {
            sub: "abc".to_string(),
            role: Role::Student,
            exp: 0,
        };
        assert!(Caller::try_from(&claims).is_err());
    }
}
