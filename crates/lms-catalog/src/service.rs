//! Catalog service implementation.
//!
//! This module provides the `Catalog` trait and the `CatalogService`
//! implementation that validates inputs and runs the matching store query.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use chrono::Utc;
use lms_core::CourseId;
use lms_store::{
    Course, CourseActivity, CourseDuration, CourseFacets, CourseRevenue, CourseStudents,
    CourseSummary, CourseWithEnrollments, Enrollment, EnrollmentFilter, FacetOptions,
    IndexDescription, Lesson, LevelCount, LevelTotal, Order, Progress, ProgressTotals, Store,
    TagCount,
};

use crate::error::{CatalogError, Result};
use crate::types::{
    parse_course_id, ActivityDefaults, ActivityInput, CourseIdInput, CoursePreset,
    EnrollmentQuery, FacetPage, FilterInput, Page, ProgressQuery,
};

/// Number of rows returned by the top-N rankings.
pub const TOP_N: u32 = 10;

/// Trait defining the catalog operations.
///
/// Every operation validates its input completely before touching the store.
#[async_trait]
pub trait Catalog: Send + Sync {
    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the store answers.
    async fn ping(&self) -> Result<()>;

    // =========================================================================
    // Course listings
    // =========================================================================

    /// Run a canned listing.
    async fn preset_courses(&self, preset: CoursePreset) -> Result<Vec<Course>>;

    /// The execution plan of a canned listing.
    async fn explain_preset(&self, preset: CoursePreset) -> Result<Document>;

    /// Every course, newest first.
    async fn list_courses(&self) -> Result<Vec<Course>>;

    /// The indexes of the courses collection.
    async fn course_indexes(&self) -> Result<Vec<IndexDescription>>;

    /// Every course joined with its enrollments.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a malformed user id or status.
    async fn courses_with_enrollments(
        &self,
        query: &EnrollmentQuery,
    ) -> Result<Vec<CourseWithEnrollments>>;

    /// One course joined with its enrollments.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for malformed input and
    /// `CatalogError::CourseNotFound` if the course doesn't exist.
    async fn course_with_enrollments(
        &self,
        course_id: &str,
        query: &EnrollmentQuery,
    ) -> Result<CourseWithEnrollments>;

    /// Progress totals per (user, course).
    async fn progress_totals(&self, query: &ProgressQuery) -> Result<Vec<ProgressTotals>>;

    // =========================================================================
    // Lessons
    // =========================================================================

    /// Lessons of a course in order, through a plain find.
    async fn lessons_by_course(&self, input: &CourseIdInput) -> Result<Vec<Lesson>>;

    /// Lessons of a course in order, through an aggregation.
    async fn lessons_by_course_aggregate(&self, input: &CourseIdInput) -> Result<Vec<Lesson>>;

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Course count per level.
    async fn count_courses_by_level(&self) -> Result<Vec<LevelTotal>>;

    /// Active students of an existing course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a malformed id and
    /// `CatalogError::CourseNotFound` if the course doesn't exist.
    async fn count_students_by_course(&self, input: &CourseIdInput)
        -> Result<Vec<CourseStudents>>;

    /// Completed study time of an existing course.
    ///
    /// # Errors
    ///
    /// Same gate as [`count_students_by_course`](Catalog::count_students_by_course).
    async fn total_duration_by_course(&self, input: &CourseIdInput)
        -> Result<Vec<CourseDuration>>;

    /// Course count per tag, unlimited.
    async fn count_courses_by_tags(&self) -> Result<Vec<TagCount>>;

    /// The most frequent tags.
    async fn top_tags(&self) -> Result<Vec<TagCount>>;

    /// The most populated levels.
    async fn top_courses_by_level(&self) -> Result<Vec<LevelCount>>;

    /// Courses ranked by recent enrollments.
    async fn top_courses_by_recent_enrollments(
        &self,
        input: &ActivityInput,
    ) -> Result<Vec<CourseActivity>>;

    /// Courses ranked by recent paid revenue.
    async fn revenue_by_course(&self, input: &ActivityInput) -> Result<Vec<CourseRevenue>>;

    // =========================================================================
    // Price filters
    // =========================================================================

    /// One page of courses inside the price range.
    async fn filter_courses(&self, input: &FilterInput) -> Result<Vec<CourseSummary>>;

    /// Faceted search with price buckets, in one call.
    async fn filter_with_facet(&self, input: &FilterInput) -> Result<CourseFacets>;

    /// One page plus the total, from two concurrent queries.
    async fn filter_and_paginate(&self, input: &FilterInput) -> Result<Page<CourseSummary>>;

    /// Faceted search plus an independent total, from two concurrent queries.
    async fn filter_with_facets(&self, input: &FilterInput) -> Result<FacetPage>;

    // =========================================================================
    // Dumps
    // =========================================================================

    /// Every enrollment.
    async fn all_enrollments(&self) -> Result<Vec<Enrollment>>;

    /// Every progress entry.
    async fn all_progress(&self) -> Result<Vec<Progress>>;

    /// Every order.
    async fn all_orders(&self) -> Result<Vec<Order>>;
}

/// The catalog service implementation.
pub struct CatalogService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> CatalogService<S> {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse the id, then confirm the course exists.
    async fn existing_course(&self, input: &CourseIdInput) -> Result<CourseId> {
        let course_id = input.course_id()?;
        if self.store.get_course(course_id).await?.is_none() {
            tracing::debug!(course_id = %course_id, "course not found");
            return Err(CatalogError::CourseNotFound(course_id));
        }
        Ok(course_id)
    }
}

#[async_trait]
impl<S: Store + 'static> Catalog for CatalogService<S> {
    async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }

    // =========================================================================
    // Course listings
    // =========================================================================

    async fn preset_courses(&self, preset: CoursePreset) -> Result<Vec<Course>> {
        let courses = self.store.find_courses(&preset.query()).await?;
        tracing::debug!(preset = preset.name(), count = courses.len(), "preset listing");
        Ok(courses)
    }

    async fn explain_preset(&self, preset: CoursePreset) -> Result<Document> {
        Ok(self.store.explain_courses(&preset.query()).await?)
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.store.find_courses(&lms_store::CourseQuery::all()).await?)
    }

    async fn course_indexes(&self) -> Result<Vec<IndexDescription>> {
        Ok(self.store.course_indexes().await?)
    }

    async fn courses_with_enrollments(
        &self,
        query: &EnrollmentQuery,
    ) -> Result<Vec<CourseWithEnrollments>> {
        let filter = query.to_filter()?;
        Ok(self.store.courses_with_enrollments(&filter).await?)
    }

    async fn course_with_enrollments(
        &self,
        course_id: &str,
        query: &EnrollmentQuery,
    ) -> Result<CourseWithEnrollments> {
        let course_id = parse_course_id("id", Some(course_id))?;
        let filter = EnrollmentFilter {
            course_id: Some(course_id),
            ..query.to_filter()?
        };
        self.store
            .courses_with_enrollments(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::CourseNotFound(course_id))
    }

    async fn progress_totals(&self, query: &ProgressQuery) -> Result<Vec<ProgressTotals>> {
        let filter = query.to_filter()?;
        Ok(self.store.progress_totals(&filter).await?)
    }

    // =========================================================================
    // Lessons
    // =========================================================================

    async fn lessons_by_course(&self, input: &CourseIdInput) -> Result<Vec<Lesson>> {
        let course_id = input.course_id()?;
        Ok(self.store.find_lessons(course_id).await?)
    }

    async fn lessons_by_course_aggregate(&self, input: &CourseIdInput) -> Result<Vec<Lesson>> {
        let course_id = input.course_id()?;
        Ok(self.store.aggregate_lessons(course_id).await?)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    async fn count_courses_by_level(&self) -> Result<Vec<LevelTotal>> {
        Ok(self.store.count_courses_by_level().await?)
    }

    async fn count_students_by_course(
        &self,
        input: &CourseIdInput,
    ) -> Result<Vec<CourseStudents>> {
        let course_id = self.existing_course(input).await?;
        Ok(self.store.count_active_students(course_id).await?)
    }

    async fn total_duration_by_course(
        &self,
        input: &CourseIdInput,
    ) -> Result<Vec<CourseDuration>> {
        let course_id = self.existing_course(input).await?;
        Ok(self.store.total_completed_duration(course_id).await?)
    }

    async fn count_courses_by_tags(&self) -> Result<Vec<TagCount>> {
        Ok(self.store.count_courses_by_tag(None).await?)
    }

    async fn top_tags(&self) -> Result<Vec<TagCount>> {
        Ok(self.store.count_courses_by_tag(Some(TOP_N)).await?)
    }

    async fn top_courses_by_level(&self) -> Result<Vec<LevelCount>> {
        Ok(self.store.top_levels(TOP_N).await?)
    }

    async fn top_courses_by_recent_enrollments(
        &self,
        input: &ActivityInput,
    ) -> Result<Vec<CourseActivity>> {
        let window = input.to_window(ActivityDefaults::RECENT_ENROLLMENTS, Utc::now())?;
        Ok(self.store.recent_enrollment_activity(&window).await?)
    }

    async fn revenue_by_course(&self, input: &ActivityInput) -> Result<Vec<CourseRevenue>> {
        let window = input.to_window(ActivityDefaults::REVENUE, Utc::now())?;
        Ok(self.store.revenue_by_course(&window).await?)
    }

    // =========================================================================
    // Price filters
    // =========================================================================

    async fn filter_courses(&self, input: &FilterInput) -> Result<Vec<CourseSummary>> {
        let request = input.resolve()?;
        Ok(self
            .store
            .filter_courses(&request.range, request.limit)
            .await?)
    }

    async fn filter_with_facet(&self, input: &FilterInput) -> Result<CourseFacets> {
        let request = input.resolve()?;
        let options = FacetOptions {
            limit: request.limit,
            price_buckets: true,
        };
        Ok(self.store.course_facets(&request.range, &options).await?)
    }

    async fn filter_and_paginate(&self, input: &FilterInput) -> Result<Page<CourseSummary>> {
        let request = input.resolve()?;
        let (items, total) = tokio::try_join!(
            self.store.filter_courses(&request.range, request.limit),
            self.store.count_courses(&request.range),
        )?;
        Ok(Page { items, total })
    }

    async fn filter_with_facets(&self, input: &FilterInput) -> Result<FacetPage> {
        let request = input.resolve()?;
        let options = FacetOptions {
            limit: request.limit,
            price_buckets: false,
        };
        let (facets, total) = tokio::try_join!(
            self.store.course_facets(&request.range, &options),
            self.store.count_courses(&request.range),
        )?;
        if facets.total != total {
            tracing::warn!(
                facet_total = facets.total,
                count_total = total,
                "facet and count totals differ"
            );
        }
        Ok(FacetPage { facets, total })
    }

    // =========================================================================
    // Dumps
    // =========================================================================

    async fn all_enrollments(&self) -> Result<Vec<Enrollment>> {
        Ok(self.store.list_enrollments().await?)
    }

    async fn all_progress(&self) -> Result<Vec<Progress>> {
        Ok(self.store.list_progress().await?)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;
    use lms_core::{
        EnrollmentStatus, LessonId, Level, OrderStatus, ProgressStatus, RecordId, UserId,
    };
    use lms_store::{CourseStats, MemoryStore};

    fn course(slug: &str, price: f64, tags: &[&str], day: i64) -> Course {
        Course {
            id: CourseId::generate(),
            title: slug.to_string(),
            slug: slug.to_string(),
            lang: "vi".to_string(),
            price,
            level: Some(Level::Beginner),
            tags: tags.iter().map(ToString::to_string).collect(),
            published_at: Some(DateTime::from_millis(day * 86_400_000)),
            stats: CourseStats::default(),
            created_at: None,
        }
    }

    async fn service_with(courses: &[Course]) -> CatalogService<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_courses(courses).await.unwrap();
        CatalogService::new(store)
    }

    #[tokio::test]
    async fn paginate_total_counts_whole_filtered_set() {
        let service = service_with(&[course("only", 150_000.0, &["rust"], 1)]).await;
        let page = service
            .filter_and_paginate(&FilterInput::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn total_is_independent_of_limit() {
        let courses: Vec<_> = (0..5)
            .map(|i| course(&format!("c{i}"), 120_000.0, &["x"], i))
            .collect();
        let service = service_with(&courses).await;
        let input = FilterInput {
            limit: Some(2.0.into()),
            ..FilterInput::default()
        };

        let page = service.filter_and_paginate(&input).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);

        let facets = service.filter_with_facets(&input).await.unwrap();
        assert_eq!(facets.facets.items.len(), 2);
        assert_eq!(facets.facets.total, facets.total);
        assert!(facets.facets.price_buckets.is_none());
    }

    #[tokio::test]
    async fn filtered_items_respect_bounds() {
        let service = service_with(&[
            course("cheap", 50_000.0, &[], 1),
            course("low-edge", 100_000.0, &[], 2),
            course("high-edge", 200_000.0, &[], 3),
            course("pricey", 250_000.0, &[], 4),
        ])
        .await;
        let items = service
            .filter_courses(&FilterInput::default())
            .await
            .unwrap();
        let titles: Vec<_> = items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["high-edge", "low-edge"]);
    }

    #[tokio::test]
    async fn invalid_filter_never_reaches_store() {
        let service = service_with(&[]).await;
        service.store().set_available(false);
        let err = service
            .filter_courses(&FilterInput {
                min: Some("abc".into()),
                ..FilterInput::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn gate_checks_shape_before_existence() {
        let service = service_with(&[]).await;

        let err = service
            .count_students_by_course(&CourseIdInput::new(""))
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), 400);

        let err = service
            .total_duration_by_course(&CourseIdInput::new(CourseId::generate().to_hex()))
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), 404);
    }

    #[tokio::test]
    async fn students_counted_for_existing_course() {
        let target = course("target", 100_000.0, &[], 1);
        let service = service_with(std::slice::from_ref(&target)).await;
        service
            .store()
            .insert_enrollments(&[Enrollment {
                id: RecordId::generate(),
                user_id: UserId::generate(),
                course_id: target.id,
                enrolled_at: DateTime::now(),
                status: EnrollmentStatus::Active,
            }])
            .await
            .unwrap();

        let rows = service
            .count_students_by_course(&CourseIdInput::new(target.id.to_hex()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_students, 1);

        let durations = service
            .total_duration_by_course(&CourseIdInput::new(target.id.to_hex()))
            .await
            .unwrap();
        assert!(durations.is_empty());
    }

    #[tokio::test]
    async fn completed_duration_sums_done_entries_only() {
        let target = course("target", 100_000.0, &[], 1);
        let service = service_with(std::slice::from_ref(&target)).await;
        let entry = |status, duration_sec| Progress {
            id: RecordId::generate(),
            user_id: UserId::generate(),
            course_id: target.id,
            lesson_id: LessonId::generate(),
            status,
            duration_sec,
            updated_at: DateTime::now(),
        };
        service
            .store()
            .insert_progress(&[
                entry(ProgressStatus::Done, 100),
                entry(ProgressStatus::Done, 50),
                entry(ProgressStatus::Incomplete, 999),
            ])
            .await
            .unwrap();

        let rows = service
            .total_duration_by_course(&CourseIdInput::new(target.id.to_hex()))
            .await
            .unwrap();
        assert_eq!(rows[0].total_duration, 150);
    }

    #[tokio::test]
    async fn ex3_requires_every_tag() {
        let service = service_with(&[
            course("both", 100_000.0, &["mongodb", "node", "db"], 1),
            course("one", 100_000.0, &["mongodb", "react"], 2),
        ])
        .await;
        let found = service.preset_courses(CoursePreset::Ex3).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "both");
    }

    #[tokio::test]
    async fn single_course_join_not_found() {
        let service = service_with(&[course("a", 1.0, &[], 1)]).await;
        let err = service
            .course_with_enrollments(&CourseId::generate().to_hex(), &EnrollmentQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::CourseNotFound(_)));

        let err = service
            .course_with_enrollments("nope", &EnrollmentQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn top_tags_never_exceed_unlimited_counts() {
        let courses: Vec<_> = (0..15)
            .map(|i| {
                let tag = format!("t{i}");
                course(&format!("c{i}"), 1.0, &[tag.as_str(), "shared"], i)
            })
            .collect();
        let service = service_with(&courses).await;

        let top = service.top_tags().await.unwrap();
        let all = service.count_courses_by_tags().await.unwrap();
        assert_eq!(top.len(), TOP_N as usize);
        assert_eq!(all.len(), 16);
        assert_eq!(top[0].tag, "shared");
        let top_sum: i64 = top.iter().map(|t| t.count).sum();
        let all_sum: i64 = all.iter().map(|t| t.count).sum();
        assert!(top_sum <= all_sum);
    }

    #[tokio::test]
    async fn revenue_ranks_paid_orders_with_defaults() {
        let target = course("target", 100_000.0, &[], 1);
        let service = service_with(std::slice::from_ref(&target)).await;
        let paid = |amount, status| Order {
            id: RecordId::generate(),
            user_id: UserId::generate(),
            course_id: target.id,
            amount,
            status,
            paid_at: DateTime::now(),
        };
        service
            .store()
            .insert_orders(&[
                paid(150_000.0, OrderStatus::Paid),
                paid(100_000.0, OrderStatus::Paid),
                paid(700_000.0, OrderStatus::Refunded),
            ])
            .await
            .unwrap();

        let rows = service
            .revenue_by_course(&ActivityInput::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].revenue, 250_000.0);
        assert_eq!(rows[0].orders, 2);
        assert_eq!(rows[0].title.as_deref(), Some("target"));

        let err = service
            .revenue_by_course(&ActivityInput {
                days: None,
                limit: Some("ten".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), 400);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let service = service_with(&[]).await;
        service.store().set_available(false);
        let err = service.list_courses().await.unwrap_err();
        assert_eq!(err.http_status_code(), 500);
    }
}
