//! MongoDB storage layer for the LMS course platform.
//!
//! This crate owns every database access of the platform: course listings,
//! course/enrollment joins, grouped aggregations and the seeding writes.
//!
//! # Architecture
//!
//! The data lives in five collections (see [`schema::collection`]):
//!
//! - `courses`: course catalog, keyed by `_id`, unique `slug`
//! - `lessons`: lessons, each referencing one course
//! - `enrollments`: user/course links with an enrollment time
//! - `orders`: purchases with amount and payment time
//! - `progresses`: per-user, per-lesson completion state
//!
//! Queries are built as plain documents in [`pipeline`] and executed by a
//! [`Store`] implementation. [`MongoStore`] talks to a real server; with the
//! `test-utils` feature, [`MemoryStore`] evaluates the same operations over
//! in-memory collections.
//!
//! # Example
//!
//! ```no_run
//! use lms_store::{CourseQuery, MongoStore, Store};
//! use lms_core::Level;
//!
//! # async fn run() -> lms_store::Result<()> {
//! let store = MongoStore::connect("mongodb://localhost:27017", "lms").await?;
//! let query = CourseQuery::all().with_levels([Level::Beginner]).with_limit(5);
//! let courses = store.find_courses(&query).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod mongo;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use query::{
    ActivityWindow, CourseQuery, EnrollmentFilter, FacetOptions, PriceRange, ProgressFilter,
    TagMatch,
};
pub use types::{
    BucketKey, Course, CourseActivity, CourseDuration, CourseFacets, CourseRevenue, CourseStats,
    CourseStudents, CourseSummary, CourseWithEnrollments, Enrollment, IndexDescription, Lesson,
    LessonContent, LessonStats, LevelCount, LevelTotal, Order, PriceBucket, Progress,
    ProgressTotals, TagCount,
};

use async_trait::async_trait;
use bson::Document;
use lms_core::CourseId;

/// The storage trait defining all database operations.
///
/// Listing operations return records in a deterministic order; ties on the
/// primary sort key are broken by `_id`.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Check that the database answers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the server cannot be reached.
    async fn ping(&self) -> Result<()>;

    /// Create every declared index. Existing indexes are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if an index cannot be created.
    async fn sync_indexes(&self) -> Result<()>;

    // =========================================================================
    // Courses
    // =========================================================================

    /// List courses matching the query, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_courses(&self, query: &CourseQuery) -> Result<Vec<Course>>;

    /// The execution plan of [`find_courses`](Store::find_courses) for the
    /// same query.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn explain_courses(&self, query: &CourseQuery) -> Result<Document>;

    /// Get a course by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>>;

    /// The indexes present on the courses collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn course_indexes(&self) -> Result<Vec<IndexDescription>>;

    /// Every course (or the one named by `filter.course_id`) joined with its
    /// enrollments matching the rest of `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn courses_with_enrollments(
        &self,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<CourseWithEnrollments>>;

    /// Courses inside the price range, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn filter_courses(&self, range: &PriceRange, limit: u32) -> Result<Vec<CourseSummary>>;

    /// Number of courses inside the price range.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_courses(&self, range: &PriceRange) -> Result<u64>;

    /// Faceted search over the courses inside the price range.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn course_facets(&self, range: &PriceRange, options: &FacetOptions)
        -> Result<CourseFacets>;

    // =========================================================================
    // Lessons
    // =========================================================================

    /// The lessons of a course in `order`, using a plain find.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>>;

    /// The lessons of a course in `order`, using an aggregation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn aggregate_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>>;

    // =========================================================================
    // Progress
    // =========================================================================

    /// Progress totals per (user, course).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn progress_totals(&self, filter: &ProgressFilter) -> Result<Vec<ProgressTotals>>;

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Course count per level.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_courses_by_level(&self) -> Result<Vec<LevelTotal>>;

    /// Course count per level keyed by `_id`, at most `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn top_levels(&self, limit: u32) -> Result<Vec<LevelCount>>;

    /// Course count per tag, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_courses_by_tag(&self, limit: Option<u32>) -> Result<Vec<TagCount>>;

    /// Active enrollments of one course. Empty if there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_active_students(&self, course_id: CourseId) -> Result<Vec<CourseStudents>>;

    /// Completed study time of one course. Empty if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn total_completed_duration(&self, course_id: CourseId) -> Result<Vec<CourseDuration>>;

    /// Courses ranked by enrollments inside the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn recent_enrollment_activity(
        &self,
        window: &ActivityWindow,
    ) -> Result<Vec<CourseActivity>>;

    /// Courses ranked by paid revenue inside the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn revenue_by_course(&self, window: &ActivityWindow) -> Result<Vec<CourseRevenue>>;

    // =========================================================================
    // Raw listings
    // =========================================================================

    /// Every enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_enrollments(&self) -> Result<Vec<Enrollment>>;

    /// Every progress entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_progress(&self) -> Result<Vec<Progress>>;

    /// Every order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Every lesson.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_lessons(&self) -> Result<Vec<Lesson>>;

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Drop a collection and recreate its indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn reset_collection(&self, name: &str) -> Result<()>;

    /// Insert courses; duplicates are skipped and the rest still land.
    ///
    /// Returns the number of inserted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_courses(&self, courses: &[Course]) -> Result<u64>;

    /// Insert lessons.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_lessons(&self, lessons: &[Lesson]) -> Result<u64>;

    /// Insert enrollments.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_enrollments(&self, enrollments: &[Enrollment]) -> Result<u64>;

    /// Insert orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_orders(&self, orders: &[Order]) -> Result<u64>;

    /// Insert progress entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_progress(&self, progress: &[Progress]) -> Result<u64>;

    /// Set the denormalized lesson count of a course.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the course doesn't exist.
    async fn set_lesson_count(&self, course_id: CourseId, count: i64) -> Result<()>;
}
