// src/storage/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{
    AttemptRepository, CourseRepository, MockTestRepository, StorageError, UserRepository,
};
use crate::models::{
    attempt::{NewAttempt, TestAttempt},
    course::{Course, CreateCourseRequest},
    mock_test::{CreateMockTestRequest, MockTest},
    question::{CreateQuestionRequest, Question},
    user::User,
};

const USER_COLUMNS: &str = "id, username, password, created_at";
const COURSE_COLUMNS: &str =
    "id, title, description, image_url, author_id, duration, price, featured";
const MOCK_TEST_COLUMNS: &str = "id, title, description, duration_minutes, total_questions, \
     difficulty, image_url, author_id, featured";
const QUESTION_COLUMNS: &str = "id, mock_test_id, text, options, correct_option, explanation";
const ATTEMPT_COLUMNS: &str =
    "id, user_id, mock_test_id, score, correct_answers, total_questions, completed_at";

/// PostgreSQL backing. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn log_db_error(context: &str, err: sqlx::Error) -> StorageError {
    tracing::error!("{}: {:?}", context, err);
    StorageError::from(err)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StorageError> {
        let sql = format!(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StorageError::from(e) {
                StorageError::Conflict(_) => {
                    StorageError::Conflict(format!("username '{}' already exists", username))
                }
                other => {
                    tracing::error!("Failed to register user: {}", other);
                    other
                }
            })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to look up user", e))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to fetch user", e))
    }
}

#[async_trait]
impl CourseRepository for PgStore {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let sql = format!("SELECT {} FROM courses ORDER BY id", COURSE_COLUMNS);
        sqlx::query_as::<_, Course>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to list courses", e))
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StorageError> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to fetch course", e))
    }

    async fn create_course(
        &self,
        author_id: Option<i64>,
        req: &CreateCourseRequest,
    ) -> Result<Course, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO courses (title, description, image_url, author_id, duration, price, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COURSE_COLUMNS
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(&req.title)
            .bind(&req.description)
            .bind(&req.image_url)
            .bind(author_id)
            .bind(&req.duration)
            .bind(req.price)
            .bind(req.featured)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to create course", e))
    }
}

#[async_trait]
impl MockTestRepository for PgStore {
    async fn list_tests(&self) -> Result<Vec<MockTest>, StorageError> {
        let sql = format!("SELECT {} FROM mock_tests ORDER BY id", MOCK_TEST_COLUMNS);
        sqlx::query_as::<_, MockTest>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to list mock tests", e))
    }

    async fn get_test(&self, id: i64) -> Result<Option<MockTest>, StorageError> {
        let sql = format!("SELECT {} FROM mock_tests WHERE id = $1", MOCK_TEST_COLUMNS);
        sqlx::query_as::<_, MockTest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to fetch mock test", e))
    }

    async fn create_test(
        &self,
        author_id: Option<i64>,
        req: &CreateMockTestRequest,
    ) -> Result<MockTest, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO mock_tests
                (title, description, duration_minutes, total_questions, difficulty, image_url, author_id, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            MOCK_TEST_COLUMNS
        );
        sqlx::query_as::<_, MockTest>(&sql)
            .bind(&req.title)
            .bind(&req.description)
            .bind(req.duration_minutes)
            .bind(req.total_questions)
            .bind(req.difficulty.as_str())
            .bind(&req.image_url)
            .bind(author_id)
            .bind(req.featured)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to create mock test", e))
    }

    async fn get_questions(&self, mock_test_id: i64) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            "SELECT {} FROM questions WHERE mock_test_id = $1 ORDER BY id",
            QUESTION_COLUMNS
        );
        sqlx::query_as::<_, Question>(&sql)
            .bind(mock_test_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to fetch questions", e))
    }

    async fn create_question(
        &self,
        mock_test_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Question, StorageError> {
        let correct_option = i32::try_from(req.correct_option)
            .map_err(|_| StorageError::Database("correct option out of range".to_string()))?;
        let sql = format!(
            r#"
            INSERT INTO questions (mock_test_id, text, options, correct_option, explanation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        sqlx::query_as::<_, Question>(&sql)
            .bind(mock_test_id)
            .bind(&req.text)
            .bind(Json(&req.options))
            .bind(correct_option)
            .bind(&req.explanation)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StorageError::from(e) {
                StorageError::NotFound(_) => StorageError::NotFound("mock test"),
                other => {
                    tracing::error!("Failed to create question: {}", other);
                    other
                }
            })
    }
}

#[async_trait]
impl AttemptRepository for PgStore {
    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<TestAttempt, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO test_attempts
                (user_id, mock_test_id, score, correct_answers, total_questions, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(attempt.user_id)
            .bind(attempt.mock_test_id)
            .bind(attempt.score)
            .bind(attempt.correct_answers)
            .bind(attempt.total_questions)
            .bind(attempt.completed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StorageError::from(e) {
                StorageError::NotFound(_) => StorageError::NotFound("mock test"),
                other => {
                    tracing::error!("Failed to record test attempt: {}", other);
                    other
                }
            })
    }

    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<TestAttempt>, StorageError> {
        let sql = format!(
            "SELECT {} FROM test_attempts WHERE user_id = $1 ORDER BY completed_at DESC, id DESC",
            ATTEMPT_COLUMNS
        );
        sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| log_db_error("Failed to list test attempts", e))
    }
}
