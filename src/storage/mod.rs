// src/storage/mod.rs

//! Repository interfaces and their backings.
//!
//! Handlers and the quiz session engine only see the traits below; `Storage`
//! bundles one trait object per entity so the backing can be swapped between
//! [`memory::MemoryStore`] and [`postgres::PgStore`].

pub mod memory;
pub mod postgres;
pub mod seed;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    attempt::{NewAttempt, TestAttempt},
    course::{Course, CreateCourseRequest},
    mock_test::{CreateMockTestRequest, MockTest},
    question::{CreateQuestionRequest, Question},
    user::User,
};

/// Errors surfaced by storage backings.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A referenced row does not exist. Carries the entity name.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StorageError::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StorageError::NotFound("referenced row");
            }
        }
        StorageError::Database(err.to_string())
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StorageError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StorageError>;

    async fn create_course(
        &self,
        author_id: Option<i64>,
        req: &CreateCourseRequest,
    ) -> Result<Course, StorageError>;
}

/// Mock tests together with their answer keys.
#[async_trait]
pub trait MockTestRepository: Send + Sync {
    async fn list_tests(&self) -> Result<Vec<MockTest>, StorageError>;

    async fn get_test(&self, id: i64) -> Result<Option<MockTest>, StorageError>;

    async fn create_test(
        &self,
        author_id: Option<i64>,
        req: &CreateMockTestRequest,
    ) -> Result<MockTest, StorageError>;

    /// All questions of a test in creation order. Empty when the test has none
    /// or does not exist.
    async fn get_questions(&self, mock_test_id: i64) -> Result<Vec<Question>, StorageError>;

    /// Appends a question. Fails with `NotFound` when the test does not exist.
    async fn create_question(
        &self,
        mock_test_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Question, StorageError>;
}

/// Append-only store of completed attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Fails with `NotFound` when the user or mock test does not exist.
    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<TestAttempt, StorageError>;

    /// Attempts of one user, newest first.
    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<TestAttempt>, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub mock_tests: Arc<dyn MockTestRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    pub fn in_memory() -> Self {
        Self::from_backend(memory::MemoryStore::new())
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_backend(postgres::PgStore::new(pool))
    }

    fn from_backend<B>(backend: B) -> Self
    where
        B: UserRepository
            + CourseRepository
            + MockTestRepository
            + AttemptRepository
            + Clone
            + 'static,
    {
        Self {
            users: Arc::new(backend.clone()),
            courses: Arc::new(backend.clone()),
            mock_tests: Arc::new(backend.clone()),
            attempts: Arc::new(backend),
        }
    }
}
