//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use lms_catalog::Catalog;

use crate::handlers::{aggregate, all, courses, health};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Liveness
/// - `GET /health` - Health check with database ping
/// - `GET /api/test` - Static liveness message
///
/// ## Courses
/// - `GET /api/courses/ex1`, `/ex2`, `/ex3` - Canned listings (`?explain=true`)
/// - `GET /api/courses/` - All courses
/// - `GET /api/courses/getIndexes` - Course indexes
/// - `GET /api/courses/with-enrollment` - Courses joined with enrollments
/// - `GET /api/courses/:id/with-enrollment` - One course joined with enrollments
/// - `GET /api/courses/progress` - Progress totals
/// - `POST /api/courses/get-lessons-by-course-id` - Lessons via find
/// - `POST /api/courses/get-lessons-by-course-id-toObjId` - Lessons via aggregation
///
/// ## Aggregates
/// - `POST /api/aggregate1/count-courses-by-level`
/// - `POST /api/aggregate1/count-students-by-course`
/// - `POST /api/aggregate1/total-duration-by-course`
/// - `POST /api/aggregate1/count-courses-by-tags`
/// - `POST /api/aggregate1/top-tags`
/// - `POST /api/aggregate1/top-courses-by-level`
/// - `POST /api/aggregate1/top-courses-by-recent-enrollments`
/// - `POST /api/aggregate1/revenue-by-course`
/// - `POST /api/aggregate1/courses-filter`
/// - `POST /api/aggregate1/courses-filter-and-facet`
/// - `POST /api/aggregate1/courses-filter-and-panigate`
/// - `POST /api/aggregate1/courses-filter-and-facets`
///
/// ## Dumps
/// - `GET /api/all/enrollments`, `/progress`, `/orders`
pub fn create_router<C>(state: GatewayState<C>) -> Router
where
    C: Catalog + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;

    let state = Arc::new(state);

    Router::new()
        // Liveness
        .route("/health", get(health::health::<C>))
        .route("/api/test", get(health::test))
        // Courses
        .route("/api/courses", get(courses::list_courses::<C>))
        .route("/api/courses/", get(courses::list_courses::<C>))
        .route("/api/courses/ex1", get(courses::ex1::<C>))
        .route("/api/courses/ex2", get(courses::ex2::<C>))
        .route("/api/courses/ex3", get(courses::ex3::<C>))
        .route("/api/courses/getIndexes", get(courses::get_indexes::<C>))
        .route(
            "/api/courses/with-enrollment",
            get(courses::with_enrollment::<C>),
        )
        .route(
            "/api/courses/:id/with-enrollment",
            get(courses::course_with_enrollment::<C>),
        )
        .route("/api/courses/progress", get(courses::progress::<C>))
        .route(
            "/api/courses/get-lessons-by-course-id",
            post(courses::lessons_by_course_id::<C>),
        )
        .route(
            "/api/courses/get-lessons-by-course-id-toObjId",
            post(courses::lessons_by_course_id_to_obj_id::<C>),
        )
        // Aggregates
        .nest("/api/aggregate1", aggregate_routes::<C>())
        // Dumps
        .route("/api/all/enrollments", get(all::enrollments::<C>))
        .route("/api/all/progress", get(all::progress::<C>))
        .route("/api/all/orders", get(all::orders::<C>))
        // Middleware
        // Innermost first: body limit, then CORS, then tracing (outermost).
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn aggregate_routes<C>() -> Router<Arc<GatewayState<C>>>
where
    C: Catalog + 'static,
{
    Router::new()
        .route(
            "/count-courses-by-level",
            post(aggregate::count_courses_by_level::<C>),
        )
        .route(
            "/count-students-by-course",
            post(aggregate::count_students_by_course::<C>),
        )
        .route(
            "/total-duration-by-course",
            post(aggregate::total_duration_by_course::<C>),
        )
        .route(
            "/count-courses-by-tags",
            post(aggregate::count_courses_by_tags::<C>),
        )
        .route("/top-tags", post(aggregate::top_tags::<C>))
        .route(
            "/top-courses-by-level",
            post(aggregate::top_courses_by_level::<C>),
        )
        .route(
            "/top-courses-by-recent-enrollments",
            post(aggregate::top_courses_by_recent_enrollments::<C>),
        )
        .route(
            "/revenue-by-course",
            post(aggregate::revenue_by_course::<C>),
        )
        .route("/courses-filter", post(aggregate::courses_filter::<C>))
        .route(
            "/courses-filter-and-facet",
            post(aggregate::courses_filter_and_facet::<C>),
        )
        .route(
            "/courses-filter-and-panigate",
            post(aggregate::courses_filter_and_paginate::<C>),
        )
        .route(
            "/courses-filter-and-facets",
            post(aggregate::courses_filter_and_facets::<C>),
        )
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_any_origin() {
        let _layer = build_cors_layer(&["*".to_string()]);
    }

    #[test]
    fn cors_specific_origins_skip_garbage() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "not a header\nvalue".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }
}
