// src/storage/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

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

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    users_by_name: HashMap<String, i64>,
    courses: BTreeMap<i64, Course>,
    mock_tests: BTreeMap<i64, MockTest>,
    questions: BTreeMap<i64, Question>,
    attempts: BTreeMap<i64, TestAttempt>,
}

struct Inner {
    tables: RwLock<Tables>,
    next_user_id: AtomicI64,
    next_course_id: AtomicI64,
    next_mock_test_id: AtomicI64,
    next_question_id: AtomicI64,
    next_attempt_id: AtomicI64,
}

/// Process-local store used by tests and when no database is configured.
/// Cloning shares the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                next_user_id: AtomicI64::new(1),
                next_course_id: AtomicI64::new(1),
                next_mock_test_id: AtomicI64::new(1),
                next_question_id: AtomicI64::new(1),
                next_attempt_id: AtomicI64::new(1),
            }),
        }
    }

    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StorageError> {
        let mut tables = self.inner.tables.write().await;
        if tables.users_by_name.contains_key(username) {
            return Err(StorageError::Conflict(format!(
                "username '{}' already exists",
                username
            )));
        }
        let user = User {
            id: Self::next(&self.inner.next_user_id),
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users_by_name.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let tables = self.inner.tables.read().await;
        Ok(tables
            .users_by_name
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        Ok(self.inner.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CourseRepository for MemoryStore {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        Ok(self.inner.tables.read().await.courses.values().cloned().collect())
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StorageError> {
        Ok(self.inner.tables.read().await.courses.get(&id).cloned())
    }

    async fn create_course(
        &self,
        author_id: Option<i64>,
        req: &CreateCourseRequest,
    ) -> Result<Course, StorageError> {
        let course = Course {
            id: Self::next(&self.inner.next_course_id),
            title: req.title.clone(),
            description: req.description.clone(),
            image_url: req.image_url.clone(),
            author_id,
            duration: req.duration.clone(),
            price: req.price,
            featured: req.featured,
        };
        self.inner
            .tables
            .write()
            .await
            .courses
            .insert(course.id, course.clone());
        Ok(course)
    }
}

#[async_trait]
impl MockTestRepository for MemoryStore {
    async fn list_tests(&self) -> Result<Vec<MockTest>, StorageError> {
        Ok(self.inner.tables.read().await.mock_tests.values().cloned().collect())
    }

    async fn get_test(&self, id: i64) -> Result<Option<MockTest>, StorageError> {
        Ok(self.inner.tables.read().await.mock_tests.get(&id).cloned())
    }

    async fn create_test(
        &self,
        author_id: Option<i64>,
        req: &CreateMockTestRequest,
    ) -> Result<MockTest, StorageError> {
        let test = MockTest {
            id: Self::next(&self.inner.next_mock_test_id),
            title: req.title.clone(),
            description: req.description.clone(),
            duration_minutes: req.duration_minutes,
            total_questions: req.total_questions,
            difficulty: req.difficulty,
            image_url: req.image_url.clone(),
            author_id,
            featured: req.featured,
        };
        self.inner
            .tables
            .write()
            .await
            .mock_tests
            .insert(test.id, test.clone());
        Ok(test)
    }

    async fn get_questions(&self, mock_test_id: i64) -> Result<Vec<Question>, StorageError> {
        Ok(self
            .inner
            .tables
            .read()
            .await
            .questions
            .values()
            .filter(|q| q.mock_test_id == mock_test_id)
            .cloned()
            .collect())
    }

    async fn create_question(
        &self,
        mock_test_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Question, StorageError> {
        let mut tables = self.inner.tables.write().await;
        if !tables.mock_tests.contains_key(&mock_test_id) {
            return Err(StorageError::NotFound("mock test"));
        }
        let question = Question {
            id: Self::next(&self.inner.next_question_id),
            mock_test_id,
            text: req.text.clone(),
            options: req.options.clone(),
            correct_option: req.correct_option,
            explanation: req.explanation.clone(),
        };
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<TestAttempt, StorageError> {
        let mut tables = self.inner.tables.write().await;
        if !tables.users.contains_key(&attempt.user_id) {
            return Err(StorageError::NotFound("user"));
        }
        if !tables.mock_tests.contains_key(&attempt.mock_test_id) {
            return Err(StorageError::NotFound("mock test"));
        }
        let record = TestAttempt {
            id: Self::next(&self.inner.next_attempt_id),
            user_id: attempt.user_id,
            mock_test_id: attempt.mock_test_id,
            score: attempt.score,
            correct_answers: attempt.correct_answers,
            total_questions: attempt.total_questions,
            completed_at: attempt.completed_at,
        };
        tables.attempts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<TestAttempt>, StorageError> {
        let tables = self.inner.tables.read().await;
        let mut list: Vec<TestAttempt> = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock_test::Difficulty;

    fn test_request() -> CreateMockTestRequest {
        CreateMockTestRequest {
            title: "Geometry".into(),
            description: "Angles and triangles".into(),
            duration_minutes: 10,
            total_questions: 2,
            difficulty: Difficulty::Beginner,
            image_url: "https://img.example.com/g.png".into(),
            featured: false,
        }
    }

    fn question_request(text: &str) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: text.into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_option: 1,
            explanation: "b".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();
        let err = store.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn questions_come_back_in_creation_order_per_test() {
        let store = MemoryStore::new();
        let first = store.create_test(None, &test_request()).await.unwrap();
        let second = store.create_test(None, &test_request()).await.unwrap();

        store.create_question(first.id, &question_request("q1")).await.unwrap();
        store.create_question(second.id, &question_request("other")).await.unwrap();
        store.create_question(first.id, &question_request("q2")).await.unwrap();

        let texts: Vec<String> = store
            .get_questions(first.id)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.text)
            .collect();
        assert_eq!(texts, vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn question_for_missing_test_is_not_found() {
        let store = MemoryStore::new();
        let err = store.create_question(99, &question_request("q")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound("mock test")));
    }

    #[tokio::test]
    async fn attempts_are_listed_newest_first() {
        let store = MemoryStore::new();
        let user = store.create_user("bob", "hash").await.unwrap();
        let test = store.create_test(None, &test_request()).await.unwrap();
        let earlier = Utc::now() - chrono::Duration::minutes(5);

        for (score, at) in [(40, earlier), (80, Utc::now())] {
            store
                .create_attempt(&NewAttempt {
                    user_id: user.id,
                    mock_test_id: test.id,
                    score,
                    correct_answers: 1,
                    total_questions: 2,
                    completed_at: at,
                })
                .await
                .unwrap();
        }

        let scores: Vec<i32> = store
            .list_attempts_for_user(user.id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.score)
            .collect();
        assert_eq!(scores, vec![80, 40]);
        assert!(store.list_attempts_for_user(user.id + 1).await.unwrap().is_empty());
    }
}
