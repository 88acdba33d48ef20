// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, LoginResponse},
    storage::Storage,
    utils::{
        hash::{hash_password, verify_password},
        json::AppJson,
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(storage): State<Storage>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let user = storage
        .users
        .create_user(&payload.username, &hashed_password)
        .await?;

    tracing::info!(user_id = user.id, "Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a bearer token.
pub async fn login(
    State(storage): State<Storage>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = storage
        .users
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.username,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        user,
    }))
}

/// Returns the authenticated user.
pub async fn me(
    State(storage): State<Storage>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = storage
        .users
        .get_user(claims.user_id()?)
        .await?
        .ok_or(AppError::AuthError("User no longer exists".to_string()))?;

    Ok(Json(user))
}
