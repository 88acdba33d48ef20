// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'questions' table in the database.
/// Each question belongs to exactly one mock test and never changes after creation.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub mock_test_id: i64,

    /// The prompt shown to the test taker.
    pub text: String,

    /// Answer choices, addressed by 0-based index.
    /// Stored as a JSON array in the database.
    #[sqlx(json)]
    pub options: Vec<String>,

    /// Index into `options` of the right answer.
    #[sqlx(try_from = "i32")]
    pub correct_option: usize,

    /// Shown after the attempt is recorded.
    pub explanation: String,
}

impl Question {
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// `true` only when `choice` is set and equals the answer key.
    pub fn is_correct(&self, choice: Option<usize>) -> bool {
        choice == Some(self.correct_option)
    }

    /// The question without its answer key.
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            text: self.text.clone(),
            options: self.options.clone(),
        }
    }
}

/// DTO for rendering a question before the attempt is recorded
/// (excludes correct option and explanation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_answer_key))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(min = 2, max = 10), custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_option: usize,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub explanation: String,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_key(req: &CreateQuestionRequest) -> Result<(), ValidationError> {
    if req.correct_option >= req.options.len() {
        let mut err = ValidationError::new("correct_option_out_of_range");
        err.message = Some("correctOption must index into options".into());
        return Err(err);
    }
    Ok(())
}
