//! Response shapes for stored records and aggregation rows.
//!
//! Object ids are rendered as 24-character hex strings and timestamps as
//! RFC 3339 strings; everything else keeps the stored camelCase layout.

use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use lms_core::{EnrollmentStatus, LessonType, Level, OrderStatus, ProgressStatus};
use lms_store::{
    Course, CourseActivity, CourseDuration, CourseFacets, CourseRevenue, CourseStats,
    CourseStudents, CourseSummary, CourseWithEnrollments, Enrollment, IndexDescription, Lesson,
    LessonContent, LessonStats, LevelCount, Order, PriceBucket, Progress, ProgressTotals, TagCount,
};
use serde::Serialize;

fn timestamp(value: bson::DateTime) -> DateTime<Utc> {
    value.to_chrono()
}

/// Render a BSON document as plain JSON.
#[must_use]
pub fn document_json(doc: Document) -> serde_json::Value {
    Bson::Document(doc).into_relaxed_extjson()
}

// =============================================================================
// Records
// =============================================================================

/// A course.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    /// Hex object id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Language code.
    pub lang: String,
    /// Price in the smallest currency unit.
    pub price: f64,
    /// Difficulty level, if set.
    pub level: Option<Level>,
    /// Topic tags.
    pub tags: Vec<String>,
    /// Publication time, `None` while unpublished.
    pub published_at: Option<DateTime<Utc>>,
    /// Denormalized counters.
    pub stats: CourseStats,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id.to_hex(),
            title: course.title,
            slug: course.slug,
            lang: course.lang,
            price: course.price,
            level: course.level,
            tags: course.tags,
            published_at: course.published_at.map(timestamp),
            stats: course.stats,
            created_at: course.created_at.map(timestamp),
        }
    }
}

/// The projected course fields returned by the price filters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummaryResponse {
    /// Hex object id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Title.
    pub title: String,
    /// Price in the smallest currency unit.
    pub price: f64,
    /// Difficulty level, if set.
    pub level: Option<Level>,
    /// Topic tags.
    pub tags: Vec<String>,
    /// Publication time, `None` while unpublished.
    pub published_at: Option<DateTime<Utc>>,
    /// Denormalized counters.
    pub stats: CourseStats,
}

impl From<CourseSummary> for CourseSummaryResponse {
    fn from(summary: CourseSummary) -> Self {
        Self {
            id: summary.id.to_hex(),
            title: summary.title,
            price: summary.price,
            level: summary.level,
            tags: summary.tags,
            published_at: summary.published_at.map(timestamp),
            stats: summary.stats,
        }
    }
}

/// A lesson.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
    /// Hex object id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Hex id of the course.
    pub course_id: String,
    /// Position inside the course, starting at 1.
    pub order: i64,
    /// Lesson format.
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    /// Format-specific content.
    pub content: LessonContent,
    /// Whether the lesson is a free preview.
    pub is_free: bool,
    /// Whether the lesson is visible.
    pub is_published: bool,
    /// Publication time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Denormalized counters.
    pub stats: LessonStats,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id.to_hex(),
            title: lesson.title,
            slug: lesson.slug,
            course_id: lesson.course_id.to_hex(),
            order: lesson.order,
            lesson_type: lesson.lesson_type,
            content: lesson.content,
            is_free: lesson.is_free,
            is_published: lesson.is_published,
            published_at: lesson.published_at.map(timestamp),
            stats: lesson.stats,
            created_at: lesson.created_at.map(timestamp),
        }
    }
}

/// An enrollment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    /// Hex object id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Hex id of the user.
    pub user_id: String,
    /// Hex id of the course.
    pub course_id: String,
    /// Enrollment time.
    pub enrolled_at: DateTime<Utc>,
    /// Enrollment state.
    pub status: EnrollmentStatus,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id.to_hex(),
            user_id: enrollment.user_id.to_hex(),
            course_id: enrollment.course_id.to_hex(),
            enrolled_at: timestamp(enrollment.enrolled_at),
            status: enrollment.status,
        }
    }
}

/// An order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Hex object id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Hex id of the user.
    pub user_id: String,
    /// Hex id of the course.
    pub course_id: String,
    /// Amount charged.
    pub amount: f64,
    /// Payment state.
    pub status: OrderStatus,
    /// Payment time.
    pub paid_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_hex(),
            user_id: order.user_id.to_hex(),
            course_id: order.course_id.to_hex(),
            amount: order.amount,
            status: order.status,
            paid_at: timestamp(order.paid_at),
        }
    }
}

/// A progress entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    /// Hex object id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Hex id of the user.
    pub user_id: String,
    /// Hex id of the course.
    pub course_id: String,
    /// Hex id of the lesson.
    pub lesson_id: String,
    /// Completion state.
    pub status: ProgressStatus,
    /// Time spent, in seconds.
    pub duration_sec: i64,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<Progress> for ProgressResponse {
    fn from(progress: Progress) -> Self {
        Self {
            id: progress.id.to_hex(),
            user_id: progress.user_id.to_hex(),
            course_id: progress.course_id.to_hex(),
            lesson_id: progress.lesson_id.to_hex(),
            status: progress.status,
            duration_sec: progress.duration_sec,
            updated_at: timestamp(progress.updated_at),
        }
    }
}

/// A course with its enrollments inlined.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithEnrollmentsResponse {
    /// The course fields, flattened.
    #[serde(flatten)]
    pub course: CourseResponse,
    /// Matching enrollments, newest first.
    pub enrollments: Vec<EnrollmentResponse>,
    /// Length of `enrollments`.
    pub enrollment_count: u64,
}

impl From<CourseWithEnrollments> for CourseWithEnrollmentsResponse {
    fn from(joined: CourseWithEnrollments) -> Self {
        Self {
            course: joined.course.into(),
            enrollments: joined.enrollments.into_iter().map(Into::into).collect(),
            enrollment_count: joined.enrollment_count,
        }
    }
}

/// One index of the courses collection.
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    /// Index name.
    pub name: Option<String>,
    /// Indexed fields and their directions.
    pub key: serde_json::Value,
    /// Whether the index is unique.
    pub unique: bool,
}

impl From<IndexDescription> for IndexResponse {
    fn from(index: IndexDescription) -> Self {
        Self {
            name: index.name,
            key: document_json(index.keys),
            unique: index.unique,
        }
    }
}

// =============================================================================
// Aggregation rows
// =============================================================================

/// Active students of one course.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStudentsResponse {
    /// Hex id of the course.
    #[serde(rename = "_id")]
    pub course_id: String,
    /// Active enrollments.
    pub total_students: i64,
}

impl From<CourseStudents> for CourseStudentsResponse {
    fn from(row: CourseStudents) -> Self {
        Self {
            course_id: row.course_id.to_hex(),
            total_students: row.total_students,
        }
    }
}

/// Completed study time of one course.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDurationResponse {
    /// Hex id of the course.
    #[serde(rename = "_id")]
    pub course_id: String,
    /// Sum of completed study seconds.
    pub total_duration: i64,
}

impl From<CourseDuration> for CourseDurationResponse {
    fn from(row: CourseDuration) -> Self {
        Self {
            course_id: row.course_id.to_hex(),
            total_duration: row.total_duration,
        }
    }
}

/// Progress totals of one (user, course) pair.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTotalsResponse {
    /// Hex id of the user.
    pub user_id: String,
    /// Hex id of the course.
    pub course_id: String,
    /// Progress entries.
    pub total_lessons: i64,
    /// Entries marked done.
    pub completed_lessons: i64,
    /// Sum of study seconds.
    pub total_duration_sec: i64,
}

impl From<ProgressTotals> for ProgressTotalsResponse {
    fn from(row: ProgressTotals) -> Self {
        Self {
            user_id: row.user_id.to_hex(),
            course_id: row.course_id.to_hex(),
            total_lessons: row.total_lessons,
            completed_lessons: row.completed_lessons,
            total_duration_sec: row.total_duration_sec,
        }
    }
}

/// Recent enrollment activity of one course.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseActivityResponse {
    /// Hex id of the course.
    pub course_id: String,
    /// Course title, `None` if the course is gone.
    pub title: Option<String>,
    /// Enrollments inside the window.
    pub enrollments: i64,
    /// Distinct enrolled users.
    pub students: i64,
}

impl From<CourseActivity> for CourseActivityResponse {
    fn from(row: CourseActivity) -> Self {
        Self {
            course_id: row.course_id.to_hex(),
            title: row.title,
            enrollments: row.enrollments,
            students: row.students,
        }
    }
}

/// Recent paid revenue of one course.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRevenueResponse {
    /// Hex id of the course.
    pub course_id: String,
    /// Course title, `None` if the course is gone.
    pub title: Option<String>,
    /// Sum of paid amounts.
    pub revenue: f64,
    /// Paid orders.
    pub orders: i64,
}

impl From<CourseRevenue> for CourseRevenueResponse {
    fn from(row: CourseRevenue) -> Self {
        Self {
            course_id: row.course_id.to_hex(),
            title: row.title,
            revenue: row.revenue,
            orders: row.orders,
        }
    }
}

/// Faceted search output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsResponse {
    /// One page of matching courses.
    pub items: Vec<CourseSummaryResponse>,
    /// Course count per level.
    pub by_level: Vec<LevelCount>,
    /// Most frequent tags.
    pub top_tags: Vec<TagCount>,
    /// Price distribution, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_buckets: Option<Vec<PriceBucket>>,
    /// Number of matching courses.
    pub total: u64,
}

impl From<CourseFacets> for FacetsResponse {
    fn from(facets: CourseFacets) -> Self {
        Self {
            items: facets.items.into_iter().map(Into::into).collect(),
            by_level: facets.by_level,
            top_tags: facets.top_tags,
            price_buckets: facets.price_buckets,
            total: facets.total,
        }
    }
}

/// Convert every element of a result list.
#[must_use]
pub fn convert<T, U: From<T>>(rows: Vec<T>) -> Vec<U> {
    rows.into_iter().map(U::from).collect()
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use lms_core::{CourseId, RecordId, UserId};
    use lms_store::BucketKey;

    use super::*;

    fn course() -> Course {
        Course {
            id: CourseId::generate(),
            title: "Rust basics".into(),
            slug: "rust-basics".into(),
            lang: "vi".into(),
            price: 150_000.0,
            level: Some(Level::Beginner),
            tags: vec!["rust".into()],
            published_at: Some(bson::DateTime::from_millis(1_700_000_000_000)),
            stats: CourseStats::default(),
            created_at: None,
        }
    }

    #[test]
    fn course_ids_and_dates_are_strings() {
        let course = course();
        let hex = course.id.to_hex();
        let json = serde_json::to_value(CourseResponse::from(course)).unwrap();
        assert_eq!(json["_id"], hex);
        assert_eq!(json["level"], "beginner");
        assert!(json["publishedAt"].as_str().unwrap().starts_with("2023-11-14"));
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn joined_course_is_flat() {
        let course = course();
        let enrollment = Enrollment {
            id: RecordId::generate(),
            user_id: UserId::generate(),
            course_id: course.id,
            enrolled_at: bson::DateTime::now(),
            status: EnrollmentStatus::Active,
        };
        let joined = CourseWithEnrollments::new(course, vec![enrollment]);
        let json = serde_json::to_value(CourseWithEnrollmentsResponse::from(joined)).unwrap();
        assert_eq!(json["title"], "Rust basics");
        assert_eq!(json["enrollmentCount"], 1);
        assert_eq!(json["enrollments"][0]["status"], "active");
    }

    #[test]
    fn index_keys_render_as_plain_json() {
        let index = IndexDescription {
            name: Some("price_1".into()),
            keys: doc! { "price": 1 },
            unique: false,
        };
        let json = serde_json::to_value(IndexResponse::from(index)).unwrap();
        assert_eq!(json["key"], serde_json::json!({"price": 1}));
    }

    #[test]
    fn bucket_keys_keep_their_shape() {
        let buckets = vec![
            PriceBucket {
                key: BucketKey::Boundary(0),
                count: 2,
            },
            PriceBucket {
                key: BucketKey::Label(">=1m".into()),
                count: 1,
            },
        ];
        let json = serde_json::to_value(&buckets).unwrap();
        assert_eq!(json[0]["_id"], 0);
        assert_eq!(json[1]["_id"], ">=1m");
    }
}
