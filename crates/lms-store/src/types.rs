//! Record types stored in the database and the rows produced by aggregations.
//!
//! Field names follow the stored camelCase document layout; primary keys are
//! stored under `_id`.

use bson::DateTime;
use lms_core::{
    CourseId, EnrollmentStatus, LessonId, LessonType, Level, OrderStatus, ProgressStatus,
    RecordId, UserId,
};
use serde::{Deserialize, Serialize};

fn default_lang() -> String {
    "vi".to_string()
}

// =============================================================================
// Records
// =============================================================================

/// A course record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Primary key.
    #[serde(rename = "_id")]
    pub id: CourseId,
    /// Display title (text indexed).
    pub title: String,
    /// Globally unique URL slug.
    pub slug: String,
    /// Content language code.
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Price in the smallest currency unit.
    #[serde(default)]
    pub price: f64,
    /// Difficulty level.
    #[serde(default)]
    pub level: Option<Level>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publication time; `None` while unpublished.
    #[serde(default)]
    pub published_at: Option<DateTime>,
    /// Denormalized counters.
    #[serde(default)]
    pub stats: CourseStats,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Denormalized course counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStats {
    /// Number of lessons in the course.
    #[serde(default)]
    pub lesson_count: i64,
    /// Number of enrolled learners.
    #[serde(default)]
    pub enrolled: i64,
}

/// The subset of course fields returned by filtered listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    /// Primary key.
    #[serde(rename = "_id")]
    pub id: CourseId,
    /// Display title.
    pub title: String,
    /// Price.
    #[serde(default)]
    pub price: f64,
    /// Difficulty level.
    #[serde(default)]
    pub level: Option<Level>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publication time.
    #[serde(default)]
    pub published_at: Option<DateTime>,
    /// Counters.
    #[serde(default)]
    pub stats: CourseStats,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            price: course.price,
            level: course.level,
            tags: course.tags.clone(),
            published_at: course.published_at,
            stats: course.stats,
        }
    }
}

/// A lesson record. Lessons belong to exactly one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Primary key.
    #[serde(rename = "_id")]
    pub id: LessonId,
    /// Display title.
    pub title: String,
    /// Globally unique slug.
    pub slug: String,
    /// Owning course.
    pub course_id: CourseId,
    /// Position inside the course, unique per course.
    pub order: i64,
    /// Lesson format.
    #[serde(rename = "type", default)]
    pub lesson_type: LessonType,
    /// Lesson body.
    #[serde(default)]
    pub content: LessonContent,
    /// Whether the lesson is available without purchase.
    #[serde(default)]
    pub is_free: bool,
    /// Whether the lesson is visible to learners.
    #[serde(default)]
    pub is_published: bool,
    /// Publication time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime>,
    /// Counters.
    #[serde(default)]
    pub stats: LessonStats,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Body of a lesson. Video fields are only set for video lessons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContent {
    /// Video location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Video transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attachment URLs.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Lesson counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonStats {
    /// View count.
    #[serde(default)]
    pub views: i64,
    /// Completion count.
    #[serde(default)]
    pub completions: i64,
}

/// Links a user to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    /// Primary key.
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// Enrolled user.
    pub user_id: UserId,
    /// Target course.
    pub course_id: CourseId,
    /// Enrollment time.
    pub enrolled_at: DateTime,
    /// Current state.
    #[serde(default)]
    pub status: EnrollmentStatus,
}

/// A purchase record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Primary key.
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// Buyer.
    pub user_id: UserId,
    /// Purchased course.
    pub course_id: CourseId,
    /// Amount charged, never negative.
    pub amount: f64,
    /// Payment state.
    #[serde(default)]
    pub status: OrderStatus,
    /// Payment time.
    pub paid_at: DateTime,
}

/// Per-user, per-lesson completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Primary key.
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// Learner.
    pub user_id: UserId,
    /// Course of the lesson.
    pub course_id: CourseId,
    /// Lesson.
    pub lesson_id: LessonId,
    /// Completion state.
    #[serde(default)]
    pub status: ProgressStatus,
    /// Time spent in seconds, never negative.
    #[serde(default)]
    pub duration_sec: i64,
    /// Last update.
    pub updated_at: DateTime,
}

/// A course joined with its (filtered) enrollments.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseWithEnrollments {
    /// The course.
    pub course: Course,
    /// Enrollments matching the join filter, newest first.
    pub enrollments: Vec<Enrollment>,
    /// Length of `enrollments`.
    pub enrollment_count: u64,
}

impl CourseWithEnrollments {
    /// Build the joined view, deriving the count from the enrollment list.
    #[must_use]
    pub fn new(course: Course, enrollments: Vec<Enrollment>) -> Self {
        let enrollment_count = enrollments.len() as u64;
        Self {
            course,
            enrollments,
            enrollment_count,
        }
    }
}

/// An index declared on a collection, as reported by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescription {
    /// Index name.
    pub name: Option<String>,
    /// Key specification, e.g. `{ level: 1, publishedAt: -1 }`.
    pub keys: bson::Document,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

// =============================================================================
// Aggregation rows
// =============================================================================

/// Number of courses at one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelTotal {
    /// The level, `None` for courses without one.
    pub level: Option<Level>,
    /// Course count.
    pub total_courses: i64,
}

/// Occurrence count keyed by level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCount {
    /// The level.
    #[serde(rename = "_id")]
    pub level: Option<Level>,
    /// Occurrences.
    pub count: i64,
}

/// Occurrence count keyed by tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    /// The tag.
    #[serde(rename = "_id")]
    pub tag: String,
    /// Occurrences.
    pub count: i64,
}

/// Active student count for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStudents {
    /// The course.
    #[serde(rename = "_id")]
    pub course_id: CourseId,
    /// Active enrollments.
    pub total_students: i64,
}

/// Completed study time for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDuration {
    /// The course.
    #[serde(rename = "_id")]
    pub course_id: CourseId,
    /// Sum of `durationSec` over done progress entries.
    pub total_duration: i64,
}

/// Progress totals for one (user, course) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTotals {
    /// Learner.
    pub user_id: UserId,
    /// Course.
    pub course_id: CourseId,
    /// Progress entries.
    pub total_lessons: i64,
    /// Entries with status `done`.
    pub completed_lessons: i64,
    /// Sum of `durationSec`.
    pub total_duration_sec: i64,
}

/// Enrollment activity for one course inside a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseActivity {
    /// Course.
    pub course_id: CourseId,
    /// Course title, `None` if the course no longer exists.
    #[serde(default)]
    pub title: Option<String>,
    /// Enrollments in the window.
    pub enrollments: i64,
    /// Distinct users among those enrollments.
    pub students: i64,
}

/// Paid revenue for one course inside a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRevenue {
    /// Course.
    pub course_id: CourseId,
    /// Course title, `None` if the course no longer exists.
    #[serde(default)]
    pub title: Option<String>,
    /// Sum of paid amounts.
    pub revenue: f64,
    /// Paid orders.
    pub orders: i64,
}

/// Key of a price bucket: the inclusive lower boundary, or the overflow label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketKey {
    /// Lower boundary of the bucket.
    Boundary(i64),
    /// Label of the default bucket.
    Label(String),
}

/// Course count inside one price bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    /// Bucket key.
    #[serde(rename = "_id")]
    pub key: BucketKey,
    /// Courses in the bucket.
    pub count: i64,
}

/// The sibling result sets of a faceted course search.
///
/// All sets are computed from the same filtered course set.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseFacets {
    /// First page of the filtered courses.
    pub items: Vec<CourseSummary>,
    /// Counts grouped by level.
    pub by_level: Vec<LevelCount>,
    /// The most frequent tags.
    pub top_tags: Vec<TagCount>,
    /// Price distribution, when requested.
    pub price_buckets: Option<Vec<PriceBucket>>,
    /// Size of the filtered set.
    pub total: u64,
}
