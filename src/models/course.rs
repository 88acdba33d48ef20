// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use crate::utils::html::clean_html;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,

    /// URL to the cover image.
    pub image_url: String,

    pub author_id: Option<i64>,

    /// Free-form length label (e.g. "10 weeks").
    pub duration: String,

    pub price: i32,
    pub featured: bool,
}

/// DTO for creating a new course.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub image_url: String,
    #[validate(length(min = 1, max = 50))]
    pub duration: String,
    #[validate(range(min = 0, max = 1_000_000))]
    pub price: i32,
    #[serde(default)]
    pub featured: bool,
}

impl CreateCourseRequest {
    /// Strips markup that could be rendered unsafely by a client.
    pub fn sanitized(mut self) -> Self {
        self.title = clean_html(&self.title);
        self.description = clean_html(&self.description);
        self
    }
}

/// Query parameters for listing courses.
#[derive(Debug, Default, Deserialize)]
pub struct CourseListParams {
    pub featured: Option<bool>,
}

/// Validates that a string is a correctly formatted URL.
pub(crate) fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
