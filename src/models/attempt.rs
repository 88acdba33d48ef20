// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::error::{FieldError, field_errors};

/// Represents the 'test_attempts' table in the database.
/// Append-only: a row is written once per completed session and never updated.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAttempt {
    pub id: i64,
    pub user_id: i64,
    pub mock_test_id: i64,

    /// Percentage, 0..=100.
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completed_at: DateTime<Utc>,
}

/// Body of `POST /test-attempts`.
///
/// The owner is taken from the authenticated session. A `userId` in the body is
/// tolerated for older clients but must name the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_counts))]
pub struct CreateAttemptRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[validate(range(min = 1))]
    pub mock_test_id: i64,
    #[validate(range(min = 0, max = 100, message = "Score must be between 0 and 100."))]
    pub score: i32,
    #[validate(range(min = 0))]
    pub correct_answers: i32,
    #[validate(range(min = 1))]
    pub total_questions: i32,
    pub completed_at: DateTime<Utc>,
}

fn validate_counts(req: &CreateAttemptRequest) -> Result<(), ValidationError> {
    if req.correct_answers > req.total_questions {
        let mut err = ValidationError::new("correct_exceeds_total");
        err.message = Some("correctAnswers cannot exceed totalQuestions".into());
        return Err(err);
    }
    Ok(())
}

/// A validated attempt, ready to be persisted for `user_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub user_id: i64,
    pub mock_test_id: i64,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completed_at: DateTime<Utc>,
}

/// Why a submitted attempt was refused before reaching storage.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptRejection {
    /// The body names a different user than the authenticated caller.
    WrongUser,
    Invalid(Vec<FieldError>),
}

impl CreateAttemptRequest {
    /// Validates the payload and binds it to the authenticated caller.
    pub fn into_new_attempt(self, caller_id: i64) -> Result<NewAttempt, AttemptRejection> {
        if let Some(claimed) = self.user_id {
            if claimed != caller_id {
                return Err(AttemptRejection::WrongUser);
            }
        }
        self.validate()
            .map_err(|errors| AttemptRejection::Invalid(field_errors(&errors)))?;

        Ok(NewAttempt {
            user_id: caller_id,
            mock_test_id: self.mock_test_id,
            score: self.score,
            correct_answers: self.correct_answers,
            total_questions: self.total_questions,
            completed_at: self.completed_at,
        })
    }
}

/// Query parameters for listing the caller's attempts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptListParams {
    pub mock_test_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(score: i32, correct: i32, total: i32) -> CreateAttemptRequest {
        CreateAttemptRequest {
            user_id: None,
            mock_test_id: 3,
            score,
            correct_answers: correct,
            total_questions: total,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn valid_payload_is_bound_to_caller() {
        let attempt = request(60, 3, 5).into_new_attempt(42).unwrap();
        assert_eq!(attempt.user_id, 42);
        assert_eq!(attempt.mock_test_id, 3);
        assert_eq!(attempt.score, 60);
    }

    #[test]
    fn zero_correct_answers_is_a_valid_attempt() {
        assert!(request(0, 0, 1).into_new_attempt(1).is_ok());
    }

    #[test]
    fn score_above_hundred_is_rejected() {
        let err = request(101, 1, 1).into_new_attempt(1).unwrap_err();
        match err {
            AttemptRejection::Invalid(details) => {
                assert!(details.iter().any(|d| d.field == "score"));
            }
            other => panic!("unexpected rejection: {:?}", other),
        }
    }

    #[test]
    fn more_correct_than_total_is_rejected() {
        let err = request(100, 6, 5).into_new_attempt(1).unwrap_err();
        assert!(matches!(err, AttemptRejection::Invalid(_)));
    }

    #[test]
    fn mismatching_user_is_rejected_before_validation() {
        let mut req = request(500, 9, 1);
        req.user_id = Some(7);
        assert_eq!(req.into_new_attempt(8).unwrap_err(), AttemptRejection::WrongUser);
    }

    #[test]
    fn body_without_user_id_serializes_without_the_field() {
        let json = serde_json::to_value(request(50, 1, 2)).unwrap();
        assert!(json.get("userId").is_none());
        assert_eq!(json["mockTestId"], 3);
        assert_eq!(json["correctAnswers"], 1);
    }
}
