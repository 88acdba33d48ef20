// src/utils/json.rs

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections (malformed JSON, missing or mistyped fields,
/// wrong content type) surface as `AppError` instead of axum's plain-text 4xx.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
