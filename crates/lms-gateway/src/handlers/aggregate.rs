//! Aggregation endpoints under `/api/aggregate1`.
//!
//! Every route is a POST; bodies are optional where all fields have defaults.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;

use lms_catalog::{ActivityInput, Catalog, CourseIdInput, FilterInput};

use crate::dto::{
    convert, CourseActivityResponse, CourseDurationResponse, CourseRevenueResponse,
    CourseStudentsResponse, CourseSummaryResponse, FacetsResponse,
};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::GatewayState;

// =============================================================================
// Counts and rankings
// =============================================================================

/// Course count per level.
pub async fn count_courses_by_level<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.count_courses_by_level().await?;
    Ok(Envelope::new(rows, "Courses counted by level"))
}

/// Active students of one course.
///
/// # Example
///
/// ```text
/// POST /api/aggregate1/count-students-by-course
/// { "courseId": "" }
///
/// Response: 400 Bad Request
/// {
///   "error": {
///     "code": "validation_failed",
///     "message": "...",
///     "details": { "courseId": "courseId is required" }
///   }
/// }
/// ```
pub async fn count_students_by_course<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<CourseIdInput>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.count_students_by_course(&input).await?;
    Ok(Envelope::new(
        convert::<_, CourseStudentsResponse>(rows),
        "Students counted by course",
    ))
}

/// Completed study time of one course.
pub async fn total_duration_by_course<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<CourseIdInput>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.total_duration_by_course(&input).await?;
    Ok(Envelope::new(
        convert::<_, CourseDurationResponse>(rows),
        "Total duration computed by course",
    ))
}

/// Course count per tag.
pub async fn count_courses_by_tags<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.count_courses_by_tags().await?;
    Ok(Envelope::new(rows, "Courses counted by tag"))
}

/// The most frequent tags.
pub async fn top_tags<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.top_tags().await?;
    Ok(Envelope::new(rows, "Top tags fetched"))
}

/// The most populated levels.
pub async fn top_courses_by_level<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.top_courses_by_level().await?;
    Ok(Envelope::new(rows, "Top levels fetched"))
}

/// Courses ranked by enrollments within the last `days` days.
pub async fn top_courses_by_recent_enrollments<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<ActivityInput>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .catalog
        .top_courses_by_recent_enrollments(&input)
        .await?;
    Ok(Envelope::new(
        convert::<_, CourseActivityResponse>(rows),
        "Courses ranked by recent enrollments",
    ))
}

/// Courses ranked by paid revenue within the last `days` days.
pub async fn revenue_by_course<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<ActivityInput>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.revenue_by_course(&input).await?;
    Ok(Envelope::new(
        convert::<_, CourseRevenueResponse>(rows),
        "Revenue computed by course",
    ))
}

// =============================================================================
// Price filters
// =============================================================================

/// One page of courses inside the price range.
///
/// # Example
///
/// ```text
/// POST /api/aggregate1/courses-filter
/// { "min": "100000", "max": 200000, "limit": 5 }
/// ```
pub async fn courses_filter<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<FilterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.catalog.filter_courses(&input).await?;
    Ok(Envelope::new(
        convert::<_, CourseSummaryResponse>(items),
        "Courses filtered by price",
    ))
}

/// Faceted search with price buckets.
pub async fn courses_filter_and_facet<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<FilterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let facets = state.catalog.filter_with_facet(&input).await?;
    Ok(Envelope::new(
        FacetsResponse::from(facets),
        "Courses filtered with facets",
    ))
}

/// One page plus the size of the whole filtered set in `meta.total`.
pub async fn courses_filter_and_paginate<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<FilterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.catalog.filter_and_paginate(&input).await?;
    Ok(Envelope::new(
        convert::<_, CourseSummaryResponse>(page.items),
        "Courses filtered and paginated",
    )
    .with_total(page.total))
}

/// Faceted search plus an independent count in `meta.total`.
pub async fn courses_filter_and_facets<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
    JsonBody(input): JsonBody<FilterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.catalog.filter_with_facets(&input).await?;
    Ok(Envelope::new(
        FacetsResponse::from(page.facets),
        "Courses filtered with facets",
    )
    .with_total(page.total))
}
