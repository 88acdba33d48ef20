// src/session/backend.rs

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    error::FieldError,
    models::{
        attempt::{AttemptRejection, CreateAttemptRequest, TestAttempt},
        mock_test::MockTest,
        question::Question,
    },
    storage::{Storage, StorageError},
};

/// Failures a session can get back from its backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("not signed in")]
    Unauthorized,
    #[error("rejected: {}", describe(.0))]
    Validation(Vec<FieldError>),
    #[error("backend unavailable: {0}")]
    Transport(String),
}

fn describe(details: &[FieldError]) -> String {
    details
        .iter()
        .map(|d| format!("{}: {}", d.field, d.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<StorageError> for BackendError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => BackendError::NotFound(what.to_string()),
            other => BackendError::Transport(other.to_string()),
        }
    }
}

/// Where a quiz session loads its test and records its attempt.
///
/// Implemented over local storage ([`StoreBackend`]) and over HTTP
/// ([`crate::client::ApiClient`]).
#[async_trait]
pub trait QuizBackend: Send + Sync {
    async fn fetch_test(&self, test_id: i64) -> Result<MockTest, BackendError>;

    /// Questions of a test in order, answer keys included.
    async fn fetch_questions(&self, test_id: i64) -> Result<Vec<Question>, BackendError>;

    async fn record_attempt(
        &self,
        request: CreateAttemptRequest,
    ) -> Result<TestAttempt, BackendError>;
}

/// In-process backend acting on behalf of one user.
#[derive(Clone)]
pub struct StoreBackend {
    storage: Storage,
    user_id: Option<i64>,
}

impl StoreBackend {
    pub fn new(storage: Storage, user_id: Option<i64>) -> Self {
        Self { storage, user_id }
    }

    fn caller(&self) -> Result<i64, BackendError> {
        self.user_id.ok_or(BackendError::Unauthorized)
    }
}

#[async_trait]
impl QuizBackend for StoreBackend {
    async fn fetch_test(&self, test_id: i64) -> Result<MockTest, BackendError> {
        self.storage
            .mock_tests
            .get_test(test_id)
            .await?
            .ok_or_else(|| BackendError::NotFound("mock test".to_string()))
    }

    async fn fetch_questions(&self, test_id: i64) -> Result<Vec<Question>, BackendError> {
        self.caller()?;
        Ok(self.storage.mock_tests.get_questions(test_id).await?)
    }

    async fn record_attempt(
        &self,
        request: CreateAttemptRequest,
    ) -> Result<TestAttempt, BackendError> {
        let caller = self.caller()?;
        let attempt = request
            .into_new_attempt(caller)
            .map_err(|rejection| match rejection {
                AttemptRejection::WrongUser => BackendError::Unauthorized,
                AttemptRejection::Invalid(details) => BackendError::Validation(details),
            })?;
        Ok(self.storage.attempts.create_attempt(&attempt).await?)
    }
}
