// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::attempt::{AttemptListParams, AttemptRejection, CreateAttemptRequest},
    storage::Storage,
    utils::{json::AppJson, jwt::Claims},
};

/// Records a completed test attempt for the caller.
///
/// * The owner always comes from the token; a mismatching `userId` in the body is a 401.
/// * Score must be within 0..=100 and `correctAnswers` may not exceed `totalQuestions`.
/// * The referenced mock test must exist.
pub async fn create_attempt(
    State(storage): State<Storage>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = payload.into_new_attempt(user_id).map_err(|rejection| match rejection {
        AttemptRejection::WrongUser => {
            AppError::AuthError("Cannot record an attempt for another user".to_string())
        }
        AttemptRejection::Invalid(details) => AppError::Validation(details),
    })?;

    if storage.mock_tests.get_test(attempt.mock_test_id).await?.is_none() {
        return Err(AppError::NotFound("Mock test not found".to_string()));
    }

    let record = storage.attempts.create_attempt(&attempt).await?;
    tracing::info!(
        user_id,
        mock_test_id = record.mock_test_id,
        score = record.score,
        "Recorded test attempt {}",
        record.id
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// Lists the caller's attempts, newest first.
pub async fn list_my_attempts(
    State(storage): State<Storage>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut attempts = storage
        .attempts
        .list_attempts_for_user(claims.user_id()?)
        .await?;
    if let Some(mock_test_id) = params.mock_test_id {
        attempts.retain(|a| a.mock_test_id == mock_test_id);
    }
    Ok(Json(attempts))
}
