// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// One of the four option letters of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChoiceError(String);

impl fmt::Display for ParseChoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not one of A, B, C, D", self.0)
    }
}

impl std::error::Error for ParseChoiceError {}

impl FromStr for Choice {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            other => Err(ParseChoiceError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Choice {
    type Error = ParseChoiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The exam this question belongs to. Never changes after insert.
    pub exam_id: i64,

    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    #[sqlx(try_from = "String")]
    pub correct_option: Choice,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to a student (excludes the correct option).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            exam_id: q.exam_id,
            question_text: q.question_text,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 255))]
    pub question_text: String,
    #[validate(length(min = 1, max = 100))]
    pub option_a: String,
    #[validate(length(min = 1, max = 100))]
    pub option_b: String,
    #[validate(length(min = 1, max = 100))]
    pub option_c: String,
    #[validate(length(min = 1, max = 100))]
    pub option_d: String,
    pub correct_option: Choice,
}

/// One entry of a bulk insert. Each entry names its exam.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkQuestionItem {
    pub exam: i64,
    #[serde(flatten)]
    #[validate(nested)]
    pub question: CreateQuestionRequest,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 255))]
    pub question_text: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub option_a: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub option_b: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub option_c: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub option_d: Option<String>,
    pub correct_option: Option<Choice>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.question_text.is_none()
            && self.option_a.is_none()
            && self.option_b.is_none()
            && self.option_c.is_none()
            && self.option_d.is_none()
            && self.correct_option.is_none()
    }
}
