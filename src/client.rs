// src/client.rs

//! HTTP client for the REST surface, usable as a [`QuizBackend`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::FieldError,
    models::{
        attempt::{CreateAttemptRequest, TestAttempt},
        mock_test::MockTest,
        question::Question,
        user::{CreateUserRequest, LoginRequest, LoginResponse, User},
    },
    session::{BackendError, QuizBackend},
};

/// Body of every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Vec<FieldError>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Returns a client that sends `token` as a bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, BackendError> {
        let body = CreateUserRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.send(self.request(Method::POST, "/api/auth/register").json(&body))
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.send(self.request(Method::POST, "/api/auth/login").json(&body))
            .await
    }

    pub async fn list_mock_tests(&self) -> Result<Vec<MockTest>, BackendError> {
        self.send(self.request(Method::GET, "/api/mock-tests")).await
    }

    /// The signed-in user's attempts, newest first.
    pub async fn list_attempts(
        &self,
        mock_test_id: Option<i64>,
    ) -> Result<Vec<TestAttempt>, BackendError> {
        let mut req = self.request(Method::GET, "/api/test-attempts");
        if let Some(id) = mock_test_id {
            req = req.query(&[("mockTestId", id)]);
        }
        self.send(req).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let response = req.send().await.map_err(transport)?;
        if response.status().is_success() {
            return response.json::<T>().await.map_err(transport);
        }
        Err(error_from(response).await)
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

async fn error_from(response: Response) -> BackendError {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.ok();
    let message = body
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        StatusCode::BAD_REQUEST => {
            let details = match body {
                Some(b) if !b.details.is_empty() => b.details,
                _ => vec![FieldError {
                    field: "__all__".to_string(),
                    message,
                }],
            };
            BackendError::Validation(details)
        }
        _ => BackendError::Transport(format!("{}: {}", status, message)),
    }
}

#[async_trait]
impl QuizBackend for ApiClient {
    async fn fetch_test(&self, test_id: i64) -> Result<MockTest, BackendError> {
        self.send(self.request(Method::GET, &format!("/api/mock-tests/{}", test_id)))
            .await
    }

    async fn fetch_questions(&self, test_id: i64) -> Result<Vec<Question>, BackendError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/mock-tests/{}/questions", test_id),
        ))
        .await
    }

    async fn record_attempt(
        &self,
        request: CreateAttemptRequest,
    ) -> Result<TestAttempt, BackendError> {
        self.send(self.request(Method::POST, "/api/test-attempts").json(&request))
            .await
    }
}
