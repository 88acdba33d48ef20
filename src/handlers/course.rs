// src/handlers/course.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::course::{CourseListParams, CreateCourseRequest},
    storage::Storage,
    utils::{json::AppJson, jwt::Claims},
};

/// Lists all courses, optionally only the featured ones.
pub async fn list_courses(
    State(storage): State<Storage>,
    Query(params): Query<CourseListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut courses = storage.courses.list_courses().await?;
    if let Some(featured) = params.featured {
        courses.retain(|c| c.featured == featured);
    }
    Ok(Json(courses))
}

/// Retrieves a single course by ID.
pub async fn get_course(
    State(storage): State<Storage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = storage
        .courses
        .get_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// Creates a course authored by the caller.
pub async fn create_course(
    State(storage): State<Storage>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let author_id = claims.user_id()?;
    let course = storage
        .courses
        .create_course(Some(author_id), &payload.sanitized())
        .await?;

    Ok((StatusCode::CREATED, Json(course)))
}
