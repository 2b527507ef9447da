//! Course listing and lesson endpoints.
//!
//! Handlers under `/api/courses`: the canned listings, the joined
//! course/enrollment views, progress totals and lessons by course.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use lms_catalog::{Catalog, CourseIdInput, CoursePreset, EnrollmentQuery, ProgressQuery};

use crate::dto::{
    convert, document_json, CourseResponse, CourseWithEnrollmentsResponse, IndexResponse,
    LessonResponse, ProgressTotalsResponse,
};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::extract::{ApiQuery, JsonBody};
use crate::state::GatewayState;

// =============================================================================
// Request Types
// =============================================================================

/// Query string of the canned listings.
#[derive(Debug, Default, Deserialize)]
pub struct PresetParams {
    /// `true` or `1` returns the execution plan instead of the courses.
    #[serde(default)]
    pub explain: Option<String>,
}

impl PresetParams {
    fn wants_explain(&self) -> bool {
        matches!(
            self.explain.as_deref().map(str::trim),
            Some("true" | "1")
        )
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn preset<C: Catalog>(
    catalog: &C,
    preset: CoursePreset,
    params: &PresetParams,
) -> Result<axum::response::Response, ApiError> {
    if params.wants_explain() {
        let plan = catalog.explain_preset(preset).await?;
        let message = format!("Execution plan for {}", preset.name());
        return Ok(Envelope::new(document_json(plan), message).into_response());
    }

    let courses = catalog.preset_courses(preset).await?;
    let message = format!("Courses fetched with {}", preset.name());
    Ok(Envelope::new(convert::<_, CourseResponse>(courses), message).into_response())
}

/// Beginner and advanced courses, newest first.
///
/// # Example
///
/// ```text
/// GET /api/courses/ex1?explain=true
///
/// Response: 200 OK
/// { "data": { "queryPlanner": ..., "executionStats": ... }, "message": "..." }
/// ```
pub async fn ex1<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    ApiQuery(params): ApiQuery<PresetParams>,
) -> Result<impl IntoResponse, ApiError> {
    preset(state.catalog.as_ref(), CoursePreset::Ex1, &params).await
}

/// Courses tagged react or nextjs.
pub async fn ex2<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    ApiQuery(params): ApiQuery<PresetParams>,
) -> Result<impl IntoResponse, ApiError> {
    preset(state.catalog.as_ref(), CoursePreset::Ex2, &params).await
}

/// Courses tagged both mongodb and node within the price cap.
pub async fn ex3<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    ApiQuery(params): ApiQuery<PresetParams>,
) -> Result<impl IntoResponse, ApiError> {
    preset(state.catalog.as_ref(), CoursePreset::Ex3, &params).await
}

/// Every course.
pub async fn list_courses<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.catalog.list_courses().await?;
    Ok(Envelope::new(
        convert::<_, CourseResponse>(courses),
        "Courses fetched successfully",
    ))
}

/// Indexes of the courses collection.
pub async fn get_indexes<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let indexes = state.catalog.course_indexes().await?;
    Ok(Envelope::new(
        convert::<_, IndexResponse>(indexes),
        "Indexes fetched successfully",
    ))
}

/// Every course with its enrollments.
///
/// Optional `userId` and `status` narrow the joined enrollments.
pub async fn with_enrollment<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    ApiQuery(query): ApiQuery<EnrollmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.catalog.courses_with_enrollments(&query).await?;
    Ok(Envelope::new(
        convert::<_, CourseWithEnrollmentsResponse>(courses),
        "Courses with enrollments fetched successfully",
    ))
}

/// One course with its enrollments.
///
/// # Example
///
/// ```text
/// GET /api/courses/652f1c0e8b3a4d0012345678/with-enrollment?status=active
///
/// Response: 404 Not Found
/// { "error": { "code": "not_found", "message": "not found: course 652f..." } }
/// ```
pub async fn course_with_enrollment<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<EnrollmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.catalog.course_with_enrollments(&id, &query).await?;
    Ok(Envelope::new(
        CourseWithEnrollmentsResponse::from(course),
        "Course with enrollments fetched successfully",
    ))
}

/// Progress totals per user and course.
pub async fn progress<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    ApiQuery(query): ApiQuery<ProgressQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let totals = state.catalog.progress_totals(&query).await?;
    Ok(Envelope::new(
        convert::<_, ProgressTotalsResponse>(totals),
        "Progress fetched successfully",
    ))
}

/// Lessons of a course, through a plain find.
pub async fn lessons_by_course_id<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<CourseIdInput>,
) -> Result<impl IntoResponse, ApiError> {
    let lessons = state.catalog.lessons_by_course(&input).await?;
    Ok(Envelope::new(
        convert::<_, LessonResponse>(lessons),
        "Lessons fetched successfully",
    ))
}

/// Lessons of a course, through an aggregation.
pub async fn lessons_by_course_id_to_obj_id<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<CourseIdInput>,
) -> Result<impl IntoResponse, ApiError> {
    let lessons = state.catalog.lessons_by_course_aggregate(&input).await?;
    Ok(Envelope::new(
        convert::<_, LessonResponse>(lessons),
        "Lessons fetched successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explain_flag_parsing() {
        let flag = |v: &str| PresetParams {
            explain: Some(v.to_string()),
        };
        assert!(flag("true").wants_explain());
        assert!(flag("1").wants_explain());
        assert!(!flag("false").wants_explain());
        assert!(!flag("").wants_explain());
        assert!(!PresetParams::default().wants_explain());
    }
}
