//! Filter documents and aggregation pipelines.
//!
//! Every builder here is pure: it turns a typed query into the documents the
//! database executes. Stage order is chosen so the leading `$match`/`$sort`
//! can use the indexes declared in [`schema`](crate::schema); fan-out stages
//! (`$facet`, `$lookup`) always come after the primary filter.

use bson::{doc, Bson, Document};
use lms_core::{CourseId, EnrollmentStatus, ProgressStatus};

use crate::query::{
    ActivityWindow, CourseQuery, EnrollmentFilter, FacetOptions, PriceRange, ProgressFilter,
    TagMatch,
};
use crate::schema::collection;

/// Number of tags kept by the `topTags` facet.
pub const FACET_TOP_TAGS: u32 = 20;

/// Boundaries of the price distribution facet.
pub const PRICE_BUCKET_BOUNDARIES: [i64; 6] =
    [0, 100_000, 200_000, 500_000, 1_000_000, 999_999_999];

/// Key of the bucket collecting prices outside the boundaries.
pub const PRICE_BUCKET_OVERFLOW: &str = ">=1m";

// =============================================================================
// Shared fragments
// =============================================================================

/// Deterministic course ordering: newest first, id breaks ties.
#[must_use]
pub fn course_sort() -> Document {
    doc! { "publishedAt": -1, "_id": -1 }
}

/// Fields kept by filtered course listings.
#[must_use]
pub fn summary_projection() -> Document {
    doc! {
        "_id": 1,
        "title": 1,
        "price": 1,
        "level": 1,
        "tags": 1,
        "publishedAt": 1,
        "stats": 1,
    }
}

/// Inclusive price match.
#[must_use]
pub fn price_match(range: &PriceRange) -> Document {
    doc! { "price": { "$gte": range.min, "$lte": range.max } }
}

fn string_list(values: &[String]) -> Vec<Bson> {
    values.iter().cloned().map(Bson::String).collect()
}

/// Filter document for a course listing. Empty fields add no clause.
#[must_use]
pub fn course_filter(query: &CourseQuery) -> Document {
    let mut filter = Document::new();

    if !query.levels.is_empty() {
        let levels: Vec<Bson> = query.levels.iter().map(|l| Bson::from(*l)).collect();
        filter.insert("level", doc! { "$in": levels });
    }

    match &query.tags {
        Some(TagMatch::Any(tags)) => {
            filter.insert("tags", doc! { "$in": string_list(tags) });
        }
        Some(TagMatch::All(tags)) => {
            filter.insert("tags", doc! { "$all": string_list(tags) });
        }
        None => {}
    }

    if let Some(range) = &query.price {
        filter.insert("price", doc! { "$gte": range.min, "$lte": range.max });
    }

    filter
}

/// Filter document for enrollments.
#[must_use]
pub fn enrollment_filter(filter: &EnrollmentFilter) -> Document {
    let mut doc = Document::new();
    if let Some(course_id) = filter.course_id {
        doc.insert("courseId", course_id);
    }
    if let Some(user_id) = filter.user_id {
        doc.insert("userId", user_id);
    }
    if let Some(status) = filter.status {
        doc.insert("status", status);
    }
    doc
}

/// Newest enrollment first.
#[must_use]
pub fn enrollment_sort() -> Document {
    doc! { "enrolledAt": -1, "_id": -1 }
}

/// Filter document for the lessons of one course.
#[must_use]
pub fn lesson_filter(course_id: CourseId) -> Document {
    doc! { "courseId": course_id }
}

/// Lessons in course order.
#[must_use]
pub fn lesson_sort() -> Document {
    doc! { "order": 1, "_id": 1 }
}

/// The `explain` command for a course listing.
#[must_use]
pub fn explain_course_find(query: &CourseQuery) -> Document {
    let mut find = doc! {
        "find": collection::COURSES,
        "filter": course_filter(query),
        "sort": course_sort(),
    };
    if let Some(limit) = query.limit {
        find.insert("limit", i64::from(limit));
    }
    doc! { "explain": find, "verbosity": "executionStats" }
}

// =============================================================================
// Joins
// =============================================================================

/// Every course with its matching enrollments attached as `enrollments` and
/// the joined length as `enrollmentCount`.
///
/// A course id in the filter narrows the courses; the rest of the filter runs
/// inside the join, so courses without matching enrollments are kept with an
/// empty list.
#[must_use]
pub fn courses_with_enrollments(filter: &EnrollmentFilter) -> Vec<Document> {
    let inner = EnrollmentFilter {
        course_id: None,
        ..*filter
    };

    let mut stages = Vec::with_capacity(4);
    if let Some(course_id) = filter.course_id {
        stages.push(doc! { "$match": { "_id": course_id } });
    }
    stages.extend([
        doc! { "$sort": course_sort() },
        doc! {
            "$lookup": {
                "from": collection::ENROLLMENTS,
                "localField": "_id",
                "foreignField": "courseId",
                "as": "enrollments",
                "pipeline": [
                    { "$match": enrollment_filter(&inner) },
                    { "$sort": enrollment_sort() },
                ],
            }
        },
        doc! { "$addFields": { "enrollmentCount": { "$size": "$enrollments" } } },
    ]);
    stages
}

/// The lessons of one course in order, as an aggregation.
#[must_use]
pub fn lessons_by_course(course_id: CourseId) -> Vec<Document> {
    vec![
        doc! { "$match": lesson_filter(course_id) },
        doc! { "$sort": lesson_sort() },
    ]
}

// =============================================================================
// Grouped aggregates
// =============================================================================

/// Course count per level, largest first.
#[must_use]
pub fn count_courses_by_level() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$level", "totalCourses": { "$sum": 1 } } },
        doc! { "$sort": { "totalCourses": -1, "_id": 1 } },
        doc! { "$project": { "_id": 0, "level": "$_id", "totalCourses": 1 } },
    ]
}

/// Course count per level keyed by `_id`, capped at `limit`.
#[must_use]
pub fn top_levels(limit: u32) -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$level", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
        doc! { "$limit": i64::from(limit) },
    ]
}

fn tag_frequency_stages(limit: Option<u32>) -> Vec<Document> {
    let mut stages = vec![
        doc! { "$unwind": "$tags" },
        doc! { "$group": { "_id": "$tags", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
    ];
    if let Some(limit) = limit {
        stages.push(doc! { "$limit": i64::from(limit) });
    }
    stages
}

/// Course count per tag, one row per tag occurrence, most frequent first.
#[must_use]
pub fn count_courses_by_tag(limit: Option<u32>) -> Vec<Document> {
    tag_frequency_stages(limit)
}

/// Active enrollments of one course.
#[must_use]
pub fn count_active_students(course_id: CourseId) -> Vec<Document> {
    vec![
        doc! { "$match": { "status": EnrollmentStatus::Active, "courseId": course_id } },
        doc! { "$group": { "_id": "$courseId", "totalStudents": { "$sum": 1 } } },
    ]
}

/// Study time over the done progress entries of one course.
#[must_use]
pub fn total_completed_duration(course_id: CourseId) -> Vec<Document> {
    vec![
        doc! { "$match": { "status": ProgressStatus::Done, "courseId": course_id } },
        doc! { "$group": { "_id": "$courseId", "totalDuration": { "$sum": "$durationSec" } } },
    ]
}

/// Progress totals per (user, course), highest study time first.
#[must_use]
pub fn progress_totals(filter: &ProgressFilter) -> Vec<Document> {
    let mut matcher = Document::new();
    if let Some(course_id) = filter.course_id {
        matcher.insert("courseId", course_id);
    }
    if let Some(user_id) = filter.user_id {
        matcher.insert("userId", user_id);
    }

    vec![
        doc! { "$match": matcher },
        doc! {
            "$group": {
                "_id": { "userId": "$userId", "courseId": "$courseId" },
                "totalLessons": { "$sum": 1 },
                "completedLessons": {
                    "$sum": { "$cond": [{ "$eq": ["$status", ProgressStatus::Done] }, 1, 0] }
                },
                "totalDurationSec": { "$sum": "$durationSec" },
            }
        },
        doc! { "$sort": { "totalDurationSec": -1, "_id.courseId": 1, "_id.userId": 1 } },
        doc! {
            "$project": {
                "_id": 0,
                "userId": "$_id.userId",
                "courseId": "$_id.courseId",
                "totalLessons": 1,
                "completedLessons": 1,
                "totalDurationSec": 1,
            }
        },
    ]
}

fn course_title_join() -> [Document; 2] {
    [
        doc! {
            "$lookup": {
                "from": collection::COURSES,
                "localField": "_id",
                "foreignField": "_id",
                "as": "course",
            }
        },
        doc! { "$unwind": { "path": "$course", "preserveNullAndEmptyArrays": true } },
    ]
}

/// Courses ranked by enrollments inside the window, with distinct students.
#[must_use]
pub fn recent_enrollment_activity(window: &ActivityWindow) -> Vec<Document> {
    let since = bson::DateTime::from_chrono(window.since);
    let mut stages = vec![
        doc! { "$match": { "enrolledAt": { "$gte": since } } },
        doc! {
            "$group": {
                "_id": "$courseId",
                "enrollments": { "$sum": 1 },
                "users": { "$addToSet": "$userId" },
            }
        },
        doc! { "$project": { "enrollments": 1, "students": { "$size": "$users" } } },
        doc! { "$sort": { "enrollments": -1, "_id": 1 } },
        doc! { "$limit": i64::from(window.limit) },
    ];
    stages.extend(course_title_join());
    stages.push(doc! {
        "$project": {
            "_id": 0,
            "courseId": "$_id",
            "title": "$course.title",
            "enrollments": 1,
            "students": 1,
        }
    });
    stages
}

/// Courses ranked by paid revenue inside the window.
#[must_use]
pub fn revenue_by_course(window: &ActivityWindow) -> Vec<Document> {
    let since = bson::DateTime::from_chrono(window.since);
    let mut stages = vec![
        doc! { "$match": { "paidAt": { "$gte": since }, "status": lms_core::OrderStatus::Paid } },
        doc! {
            "$group": {
                "_id": "$courseId",
                "revenue": { "$sum": "$amount" },
                "orders": { "$sum": 1 },
            }
        },
        doc! { "$sort": { "revenue": -1, "_id": 1 } },
        doc! { "$limit": i64::from(window.limit) },
    ];
    stages.extend(course_title_join());
    stages.push(doc! {
        "$project": {
            "_id": 0,
            "courseId": "$_id",
            "title": "$course.title",
            "revenue": 1,
            "orders": 1,
        }
    });
    stages
}

// =============================================================================
// Filtered listings and facets
// =============================================================================

/// One page of courses inside the price range.
#[must_use]
pub fn filtered_courses(range: &PriceRange, limit: u32) -> Vec<Document> {
    vec![
        doc! { "$match": price_match(range) },
        doc! { "$sort": course_sort() },
        doc! { "$limit": i64::from(limit) },
        doc! { "$project": summary_projection() },
    ]
}

/// Size of the price-filtered set, as `{ totalCount }`.
#[must_use]
pub fn count_courses(range: &PriceRange) -> Vec<Document> {
    vec![
        doc! { "$match": price_match(range) },
        doc! { "$count": "totalCount" },
    ]
}

fn price_bucket_stage() -> Document {
    let boundaries: Vec<Bson> = PRICE_BUCKET_BOUNDARIES.iter().map(|b| Bson::Int64(*b)).collect();
    doc! {
        "$bucket": {
            "groupBy": "$price",
            "boundaries": boundaries,
            "default": PRICE_BUCKET_OVERFLOW,
            "output": { "count": { "$sum": 1 } },
        }
    }
}

/// Faceted search over the price-filtered set.
///
/// The filter and sort run once; every facet branch sees the full filtered
/// set and only `items` is limited to the page size.
#[must_use]
pub fn course_facets(range: &PriceRange, options: &FacetOptions) -> Vec<Document> {
    let mut facets = doc! {
        "items": [
            { "$limit": i64::from(options.limit) },
            { "$project": summary_projection() },
        ],
        "byLevel": [
            { "$group": { "_id": "$level", "count": { "$sum": 1 } } },
            { "$sort": { "count": -1, "_id": 1 } },
        ],
        "topTags": tag_frequency_stages(Some(FACET_TOP_TAGS)),
        "totalCount": [{ "$count": "value" }],
    };
    if options.price_buckets {
        facets.insert("priceBuckets", vec![price_bucket_stage()]);
    }

    vec![
        doc! { "$match": price_match(range) },
        doc! { "$sort": course_sort() },
        doc! { "$facet": facets },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::{Level, UserId};

    fn stage_names(pipeline: &[Document]) -> Vec<String> {
        pipeline
            .iter()
            .map(|stage| stage.keys().next().cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(course_filter(&CourseQuery::all()).is_empty());
    }

    #[test]
    fn level_set_uses_in() {
        let query = CourseQuery::all().with_levels([Level::Beginner, Level::Advanced]);
        let filter = course_filter(&query);
        assert_eq!(
            filter,
            doc! { "level": { "$in": ["beginner", "advanced"] } }
        );
    }

    #[test]
    fn tag_any_and_all_are_distinct_operators() {
        let tags = vec!["mongodb".to_string(), "node".to_string()];
        let any = course_filter(&CourseQuery::all().with_tags(TagMatch::Any(tags.clone())));
        let all = course_filter(&CourseQuery::all().with_tags(TagMatch::All(tags)));
        assert!(any.get_document("tags").unwrap().contains_key("$in"));
        assert!(all.get_document("tags").unwrap().contains_key("$all"));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let filter = price_match(&PriceRange::new(0.0, 500_000.0));
        let price = filter.get_document("price").unwrap();
        assert_eq!(price.get_f64("$gte").unwrap(), 0.0);
        assert_eq!(price.get_f64("$lte").unwrap(), 500_000.0);
    }

    #[test]
    fn sort_has_id_tie_break() {
        let sort = course_sort();
        let keys: Vec<_> = sort.keys().cloned().collect();
        assert_eq!(keys, vec!["publishedAt", "_id"]);
        assert_eq!(sort.get_i32("_id").unwrap(), -1);
    }

    #[test]
    fn facet_filter_runs_before_fan_out() {
        let pipeline = course_facets(
            &PriceRange::default(),
            &FacetOptions {
                limit: 10,
                price_buckets: false,
            },
        );
        assert_eq!(stage_names(&pipeline), vec!["$match", "$sort", "$facet"]);

        let facets = pipeline[2].get_document("$facet").unwrap();
        let names: Vec<_> = facets.keys().cloned().collect();
        assert_eq!(names, vec!["items", "byLevel", "topTags", "totalCount"]);
    }

    #[test]
    fn facet_limit_applies_only_to_items() {
        let pipeline = course_facets(
            &PriceRange::default(),
            &FacetOptions {
                limit: 3,
                price_buckets: true,
            },
        );
        let facets = pipeline[2].get_document("$facet").unwrap();
        let items = facets.get_array("items").unwrap();
        assert_eq!(
            items[0].as_document().unwrap().get_i64("$limit").unwrap(),
            3
        );
        let by_level = facets.get_array("byLevel").unwrap();
        assert!(by_level
            .iter()
            .all(|s| !s.as_document().unwrap().contains_key("$limit")));
        assert!(facets.contains_key("priceBuckets"));
    }

    #[test]
    fn top_tags_unwind_before_group() {
        let pipeline = count_courses_by_tag(Some(10));
        assert_eq!(
            stage_names(&pipeline),
            vec!["$unwind", "$group", "$sort", "$limit"]
        );
        assert_eq!(stage_names(&count_courses_by_tag(None)).len(), 3);
    }

    #[test]
    fn join_filter_runs_inside_lookup() {
        let user_id = UserId::generate();
        let pipeline = courses_with_enrollments(&EnrollmentFilter {
            course_id: None,
            user_id: Some(user_id),
            status: Some(EnrollmentStatus::Active),
        });
        assert_eq!(stage_names(&pipeline), vec!["$sort", "$lookup", "$addFields"]);

        let lookup = pipeline[1].get_document("$lookup").unwrap();
        let inner = lookup.get_array("pipeline").unwrap();
        let matcher = inner[0].as_document().unwrap().get_document("$match").unwrap();
        assert_eq!(matcher.get_object_id("userId").unwrap(), *user_id.as_object_id());
        assert_eq!(matcher.get_str("status").unwrap(), "active");
    }

    #[test]
    fn join_course_id_narrows_courses() {
        let course_id = CourseId::generate();
        let pipeline = courses_with_enrollments(&EnrollmentFilter {
            course_id: Some(course_id),
            ..EnrollmentFilter::default()
        });
        assert_eq!(
            stage_names(&pipeline),
            vec!["$match", "$sort", "$lookup", "$addFields"]
        );
        let matcher = pipeline[0].get_document("$match").unwrap();
        assert_eq!(matcher.get_object_id("_id").unwrap(), *course_id.as_object_id());

        let lookup = pipeline[2].get_document("$lookup").unwrap();
        let inner = lookup.get_array("pipeline").unwrap();
        let inner_match = inner[0].as_document().unwrap().get_document("$match").unwrap();
        assert!(inner_match.is_empty());
    }

    #[test]
    fn aggregate_match_comes_first() {
        let course_id = CourseId::generate();
        for pipeline in [
            count_active_students(course_id),
            total_completed_duration(course_id),
            filtered_courses(&PriceRange::default(), 10),
            count_courses(&PriceRange::default()),
        ] {
            assert_eq!(stage_names(&pipeline)[0], "$match");
        }
    }

    #[test]
    fn recent_activity_ranks_before_join() {
        let window = ActivityWindow {
            since: chrono::Utc::now(),
            limit: 5,
        };
        let names = stage_names(&recent_enrollment_activity(&window));
        let sort = names.iter().position(|n| n == "$sort").unwrap();
        let lookup = names.iter().position(|n| n == "$lookup").unwrap();
        assert!(sort < lookup);
        assert_eq!(names[0], "$match");
    }

    #[test]
    fn revenue_matches_paid_orders_in_window() {
        let since = chrono::Utc::now();
        let pipeline = revenue_by_course(&ActivityWindow { since, limit: 10 });

        let matched = pipeline[0].get_document("$match").unwrap();
        assert_eq!(matched.get_str("status").unwrap(), "paid");
        assert_eq!(
            matched.get_document("paidAt").unwrap(),
            &doc! { "$gte": bson::DateTime::from_chrono(since) }
        );
        let group = pipeline[1].get_document("$group").unwrap();
        assert_eq!(group.get_str("_id").unwrap(), "$courseId");
        assert_eq!(group.get_document("revenue").unwrap(), &doc! { "$sum": "$amount" });
        assert_eq!(
            pipeline[2].get_document("$sort").unwrap(),
            &doc! { "revenue": -1, "_id": 1 }
        );
        assert_eq!(pipeline[3].get_i64("$limit").unwrap(), 10);
        assert_eq!(stage_names(&pipeline).last().map(String::as_str), Some("$project"));
    }

    #[test]
    fn explain_wraps_find() {
        let command = explain_course_find(&CourseQuery::all().with_limit(5));
        assert_eq!(command.get_str("verbosity").unwrap(), "executionStats");
        let find = command.get_document("explain").unwrap();
        assert_eq!(find.get_str("find").unwrap(), collection::COURSES);
        assert_eq!(find.get_i64("limit").unwrap(), 5);
    }
}
