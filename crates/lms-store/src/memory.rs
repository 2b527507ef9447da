//! In-memory storage for tests.
//!
//! `MemoryStore` evaluates every [`Store`] operation over plain vectors and
//! reproduces the ordering, grouping and join behaviour of the database
//! pipelines, so service and HTTP tests can run without a server.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use bson::{doc, Document};
use lms_core::{CourseId, EnrollmentStatus, Level, OrderStatus, ProgressStatus, UserId};
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::pipeline::{self, FACET_TOP_TAGS, PRICE_BUCKET_BOUNDARIES, PRICE_BUCKET_OVERFLOW};
use crate::query::{
    ActivityWindow, CourseQuery, EnrollmentFilter, FacetOptions, PriceRange, ProgressFilter,
};
use crate::schema::{collection, indexes_for};
use crate::types::{
    BucketKey, Course, CourseActivity, CourseDuration, CourseFacets, CourseRevenue,
    CourseStudents, CourseSummary, CourseWithEnrollments, Enrollment, IndexDescription, Lesson,
    LevelCount, LevelTotal, Order, PriceBucket, Progress, ProgressTotals, TagCount,
};
use crate::Store;

#[derive(Default)]
struct Collections {
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    enrollments: Vec<Enrollment>,
    orders: Vec<Order>,
    progress: Vec<Progress>,
}

/// In-memory implementation of [`Store`].
pub struct MemoryStore {
    data: RwLock<Collections>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Collections::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the database. While unavailable every
    /// operation fails with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    fn matching_courses(&self, query: &CourseQuery) -> Vec<Course> {
        let data = self.data.read();
        let mut courses: Vec<Course> = data
            .courses
            .iter()
            .filter(|c| course_matches(c, query))
            .cloned()
            .collect();
        courses.sort_by(course_order);
        if let Some(limit) = query.limit {
            courses.truncate(limit as usize);
        }
        courses
    }

    fn lessons_of(&self, course_id: CourseId) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = self
            .data
            .read()
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        lessons
    }

    fn course_title(&self, course_id: CourseId) -> Option<String> {
        self.data
            .read()
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .map(|c| c.title.clone())
    }
}

// =============================================================================
// Evaluation helpers
// =============================================================================

fn course_matches(course: &Course, query: &CourseQuery) -> bool {
    let level_ok = query.levels.is_empty()
        || course.level.is_some_and(|level| query.levels.contains(&level));
    let tags_ok = query.tags.as_ref().map_or(true, |t| t.matches(&course.tags));
    let price_ok = query.price.map_or(true, |range| range.contains(course.price));
    level_ok && tags_ok && price_ok
}

/// `publishedAt` descending (unpublished last), then id descending.
fn course_order(a: &Course, b: &Course) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.id.cmp(&a.id))
}

fn enrollment_matches(enrollment: &Enrollment, filter: &EnrollmentFilter) -> bool {
    filter.course_id.map_or(true, |id| enrollment.course_id == id)
        && filter.user_id.map_or(true, |id| enrollment.user_id == id)
        && filter.status.map_or(true, |s| enrollment.status == s)
}

fn enrollment_order(a: &Enrollment, b: &Enrollment) -> Ordering {
    b.enrolled_at
        .cmp(&a.enrolled_at)
        .then_with(|| b.id.cmp(&a.id))
}

fn level_key(level: Option<Level>) -> Option<&'static str> {
    level.map(Level::as_str)
}

fn count_levels(courses: &[Course]) -> Vec<(Option<Level>, i64)> {
    let mut counts: HashMap<Option<Level>, i64> = HashMap::new();
    for course in courses {
        *counts.entry(course.level).or_default() += 1;
    }
    let mut rows: Vec<_> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| level_key(a.0).cmp(&level_key(b.0))));
    rows
}

fn count_tags(courses: &[Course], limit: Option<u32>) -> Vec<TagCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for tag in courses.iter().flat_map(|c| c.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let mut rows: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    if let Some(limit) = limit {
        rows.truncate(limit as usize);
    }
    rows
}

fn price_buckets(courses: &[Course]) -> Vec<PriceBucket> {
    let mut counts = vec![0_i64; PRICE_BUCKET_BOUNDARIES.len() - 1];
    let mut overflow = 0_i64;
    for course in courses {
        let slot = PRICE_BUCKET_BOUNDARIES.windows(2).position(|bounds| {
            #[allow(clippy::cast_precision_loss)]
            let (low, high) = (bounds[0] as f64, bounds[1] as f64);
            low <= course.price && course.price < high
        });
        match slot {
            Some(i) => counts[i] += 1,
            None => overflow += 1,
        }
    }

    let mut buckets: Vec<PriceBucket> = counts
        .into_iter()
        .zip(PRICE_BUCKET_BOUNDARIES)
        .filter(|(count, _)| *count > 0)
        .map(|(count, low)| PriceBucket {
            key: BucketKey::Boundary(low),
            count,
        })
        .collect();
    if overflow > 0 {
        buckets.push(PriceBucket {
            key: BucketKey::Label(PRICE_BUCKET_OVERFLOW.to_string()),
            count: overflow,
        });
    }
    buckets
}

fn sorted_by_id<T, K: Ord>(mut records: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    records.sort_by_key(key);
    records
}

fn insert_unique<T: Clone>(
    target: &mut Vec<T>,
    records: &[T],
    conflicts: impl Fn(&T, &T) -> bool,
) -> u64 {
    let mut inserted = 0;
    for record in records {
        if target.iter().any(|existing| conflicts(existing, record)) {
            continue;
        }
        target.push(record.clone());
        inserted += 1;
    }
    inserted
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn sync_indexes(&self) -> Result<()> {
        self.check()
    }

    async fn find_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        self.check()?;
        Ok(self.matching_courses(query))
    }

    async fn explain_courses(&self, query: &CourseQuery) -> Result<Document> {
        self.check()?;
        let returned = self.matching_courses(query).len() as i64;
        Ok(doc! {
            "queryPlanner": {
                "namespace": format!("memory.{}", collection::COURSES),
                "parsedQuery": pipeline::course_filter(query),
                "winningPlan": { "stage": "COLLSCAN" },
            },
            "executionStats": {
                "executionSuccess": true,
                "nReturned": returned,
            },
        })
    }

    async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>> {
        self.check()?;
        Ok(self
            .data
            .read()
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned())
    }

    async fn course_indexes(&self) -> Result<Vec<IndexDescription>> {
        self.check()?;
        let mut indexes = vec![IndexDescription {
            name: Some("_id_".to_string()),
            keys: doc! { "_id": 1 },
            unique: false,
        }];
        indexes.extend(indexes_for(collection::COURSES).into_iter().map(|model| {
            let options = model.options.unwrap_or_default();
            IndexDescription {
                name: options.name,
                keys: model.keys,
                unique: options.unique.unwrap_or(false),
            }
        }));
        Ok(indexes)
    }

    async fn courses_with_enrollments(
        &self,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<CourseWithEnrollments>> {
        self.check()?;
        let data = self.data.read();
        let inner = EnrollmentFilter {
            course_id: None,
            ..*filter
        };

        let mut courses: Vec<&Course> = data
            .courses
            .iter()
            .filter(|c| filter.course_id.map_or(true, |id| c.id == id))
            .collect();
        courses.sort_by(|a, b| course_order(a, b));

        Ok(courses
            .into_iter()
            .map(|course| {
                let mut enrollments: Vec<Enrollment> = data
                    .enrollments
                    .iter()
                    .filter(|e| e.course_id == course.id && enrollment_matches(e, &inner))
                    .cloned()
                    .collect();
                enrollments.sort_by(enrollment_order);
                CourseWithEnrollments::new(course.clone(), enrollments)
            })
            .collect())
    }

    async fn filter_courses(&self, range: &PriceRange, limit: u32) -> Result<Vec<CourseSummary>> {
        self.check()?;
        let query = CourseQuery::all().with_price(*range).with_limit(limit);
        Ok(self
            .matching_courses(&query)
            .iter()
            .map(CourseSummary::from)
            .collect())
    }

    async fn count_courses(&self, range: &PriceRange) -> Result<u64> {
        self.check()?;
        let query = CourseQuery::all().with_price(*range);
        Ok(self.matching_courses(&query).len() as u64)
    }

    async fn course_facets(
        &self,
        range: &PriceRange,
        options: &FacetOptions,
    ) -> Result<CourseFacets> {
        self.check()?;
        let filtered = self.matching_courses(&CourseQuery::all().with_price(*range));

        Ok(CourseFacets {
            items: filtered
                .iter()
                .take(options.limit as usize)
                .map(CourseSummary::from)
                .collect(),
            by_level: count_levels(&filtered)
                .into_iter()
                .map(|(level, count)| LevelCount { level, count })
                .collect(),
            top_tags: count_tags(&filtered, Some(FACET_TOP_TAGS)),
            price_buckets: options.price_buckets.then(|| price_buckets(&filtered)),
            total: filtered.len() as u64,
        })
    }

    async fn find_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        self.check()?;
        Ok(self.lessons_of(course_id))
    }

    async fn aggregate_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        self.check()?;
        Ok(self.lessons_of(course_id))
    }

    async fn progress_totals(&self, filter: &ProgressFilter) -> Result<Vec<ProgressTotals>> {
        self.check()?;
        let data = self.data.read();
        let mut totals: HashMap<(UserId, CourseId), ProgressTotals> = HashMap::new();
        for entry in data.progress.iter().filter(|p| {
            filter.user_id.map_or(true, |id| p.user_id == id)
                && filter.course_id.map_or(true, |id| p.course_id == id)
        }) {
            let row = totals
                .entry((entry.user_id, entry.course_id))
                .or_insert_with(|| ProgressTotals {
                    user_id: entry.user_id,
                    course_id: entry.course_id,
                    total_lessons: 0,
                    completed_lessons: 0,
                    total_duration_sec: 0,
                });
            row.total_lessons += 1;
            if entry.status == ProgressStatus::Done {
                row.completed_lessons += 1;
            }
            row.total_duration_sec += entry.duration_sec;
        }

        let mut rows: Vec<_> = totals.into_values().collect();
        rows.sort_by(|a, b| {
            b.total_duration_sec
                .cmp(&a.total_duration_sec)
                .then_with(|| a.course_id.cmp(&b.course_id))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(rows)
    }

    async fn count_courses_by_level(&self) -> Result<Vec<LevelTotal>> {
        self.check()?;
        let data = self.data.read();
        Ok(count_levels(&data.courses)
            .into_iter()
            .map(|(level, total_courses)| LevelTotal {
                level,
                total_courses,
            })
            .collect())
    }

    async fn top_levels(&self, limit: u32) -> Result<Vec<LevelCount>> {
        self.check()?;
        let data = self.data.read();
        Ok(count_levels(&data.courses)
            .into_iter()
            .take(limit as usize)
            .map(|(level, count)| LevelCount { level, count })
            .collect())
    }

    async fn count_courses_by_tag(&self, limit: Option<u32>) -> Result<Vec<TagCount>> {
        self.check()?;
        Ok(count_tags(&self.data.read().courses, limit))
    }

    async fn count_active_students(&self, course_id: CourseId) -> Result<Vec<CourseStudents>> {
        self.check()?;
        let total = self
            .data
            .read()
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id && e.status == EnrollmentStatus::Active)
            .count() as i64;
        Ok(if total == 0 {
            Vec::new()
        } else {
            vec![CourseStudents {
                course_id,
                total_students: total,
            }]
        })
    }

    async fn total_completed_duration(&self, course_id: CourseId) -> Result<Vec<CourseDuration>> {
        self.check()?;
        let data = self.data.read();
        let done: Vec<_> = data
            .progress
            .iter()
            .filter(|p| p.course_id == course_id && p.status == ProgressStatus::Done)
            .collect();
        Ok(if done.is_empty() {
            Vec::new()
        } else {
            vec![CourseDuration {
                course_id,
                total_duration: done.iter().map(|p| p.duration_sec).sum(),
            }]
        })
    }

    async fn recent_enrollment_activity(
        &self,
        window: &ActivityWindow,
    ) -> Result<Vec<CourseActivity>> {
        self.check()?;
        let since = bson::DateTime::from_chrono(window.since);
        let mut groups: HashMap<CourseId, (i64, HashSet<UserId>)> = HashMap::new();
        for enrollment in self
            .data
            .read()
            .enrollments
            .iter()
            .filter(|e| e.enrolled_at >= since)
        {
            let group = groups.entry(enrollment.course_id).or_default();
            group.0 += 1;
            group.1.insert(enrollment.user_id);
        }

        let mut ranked: Vec<_> = groups.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(window.limit as usize);

        Ok(ranked
            .into_iter()
            .map(|(course_id, (enrollments, users))| CourseActivity {
                course_id,
                title: self.course_title(course_id),
                enrollments,
                students: users.len() as i64,
            })
            .collect())
    }

    async fn revenue_by_course(&self, window: &ActivityWindow) -> Result<Vec<CourseRevenue>> {
        self.check()?;
        let since = bson::DateTime::from_chrono(window.since);
        let mut groups: HashMap<CourseId, (f64, i64)> = HashMap::new();
        for order in self
            .data
            .read()
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Paid && o.paid_at >= since)
        {
            let group = groups.entry(order.course_id).or_default();
            group.0 += order.amount;
            group.1 += 1;
        }

        let mut ranked: Vec<_> = groups.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.total_cmp(&a.1 .0).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(window.limit as usize);

        Ok(ranked
            .into_iter()
            .map(|(course_id, (revenue, orders))| CourseRevenue {
                course_id,
                title: self.course_title(course_id),
                revenue,
                orders,
            })
            .collect())
    }

    async fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
        self.check()?;
        Ok(sorted_by_id(self.data.read().enrollments.clone(), |r| r.id))
    }

    async fn list_progress(&self) -> Result<Vec<Progress>> {
        self.check()?;
        Ok(sorted_by_id(self.data.read().progress.clone(), |r| r.id))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.check()?;
        Ok(sorted_by_id(self.data.read().orders.clone(), |r| r.id))
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        self.check()?;
        Ok(sorted_by_id(self.data.read().lessons.clone(), |r| r.id))
    }

    async fn reset_collection(&self, name: &str) -> Result<()> {
        self.check()?;
        let mut data = self.data.write();
        match name {
            collection::COURSES => data.courses.clear(),
            collection::LESSONS => data.lessons.clear(),
            collection::ENROLLMENTS => data.enrollments.clear(),
            collection::ORDERS => data.orders.clear(),
            collection::PROGRESS => data.progress.clear(),
            _ => {}
        }
        Ok(())
    }

    async fn insert_courses(&self, courses: &[Course]) -> Result<u64> {
        self.check()?;
        Ok(insert_unique(&mut self.data.write().courses, courses, |a, b| {
            a.id == b.id || a.slug == b.slug
        }))
    }

    async fn insert_lessons(&self, lessons: &[Lesson]) -> Result<u64> {
        self.check()?;
        Ok(insert_unique(&mut self.data.write().lessons, lessons, |a, b| {
            a.id == b.id || a.slug == b.slug
        }))
    }

    async fn insert_enrollments(&self, enrollments: &[Enrollment]) -> Result<u64> {
        self.check()?;
        Ok(insert_unique(
            &mut self.data.write().enrollments,
            enrollments,
            |a, b| a.id == b.id,
        ))
    }

    async fn insert_orders(&self, orders: &[Order]) -> Result<u64> {
        self.check()?;
        Ok(insert_unique(&mut self.data.write().orders, orders, |a, b| {
            a.id == b.id
        }))
    }

    async fn insert_progress(&self, progress: &[Progress]) -> Result<u64> {
        self.check()?;
        Ok(insert_unique(
            &mut self.data.write().progress,
            progress,
            |a, b| a.id == b.id,
        ))
    }

    async fn set_lesson_count(&self, course_id: CourseId, count: i64) -> Result<()> {
        self.check()?;
        let mut data = self.data.write();
        let course = data
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or(StoreError::NotFound)?;
        course.stats.lesson_count = count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TagMatch;
    use crate::types::CourseStats;
    use chrono::{Duration, Utc};
    use lms_core::RecordId;

    fn course(
        title: &str,
        price: f64,
        level: Option<Level>,
        tags: &[&str],
        day: Option<i64>,
    ) -> Course {
        Course {
            id: CourseId::generate(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            lang: "vi".to_string(),
            price,
            level,
            tags: tags.iter().map(ToString::to_string).collect(),
            published_at: day.map(|d| bson::DateTime::from_millis(d * 86_400_000)),
            stats: CourseStats::default(),
            created_at: None,
        }
    }

    fn enrollment(user_id: UserId, course_id: CourseId, days_ago: i64) -> Enrollment {
        Enrollment {
            id: RecordId::generate(),
            user_id,
            course_id,
            enrolled_at: bson::DateTime::from_chrono(Utc::now() - Duration::days(days_ago)),
            status: EnrollmentStatus::Active,
        }
    }

    fn order(course_id: CourseId, amount: f64, status: OrderStatus, days_ago: i64) -> Order {
        Order {
            id: RecordId::generate(),
            user_id: UserId::generate(),
            course_id,
            amount,
            status,
            paid_at: bson::DateTime::from_chrono(Utc::now() - Duration::days(days_ago)),
        }
    }

    async fn seeded() -> (MemoryStore, Vec<Course>) {
        let store = MemoryStore::new();
        let courses = vec![
            course(
                "Rust Basics",
                150_000.0,
                Some(Level::Beginner),
                &["rust", "systems"],
                Some(10),
            ),
            course(
                "Mongo Deep Dive",
                200_000.0,
                Some(Level::Advanced),
                &["mongodb", "node"],
                Some(20),
            ),
            course("React Intro", 100_000.0, Some(Level::Beginner), &["react"], Some(30)),
            course("Draft", 120_000.0, None, &["rust"], None),
            course("Premium", 5_000_000.0, Some(Level::Intermediate), &["node"], Some(5)),
        ];
        store.insert_courses(&courses).await.unwrap();
        (store, courses)
    }

    #[tokio::test]
    async fn courses_sorted_newest_first_unpublished_last() {
        let (store, _) = seeded().await;
        let titles: Vec<_> = store
            .find_courses(&CourseQuery::all())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(
            titles,
            vec!["React Intro", "Mongo Deep Dive", "Rust Basics", "Premium", "Draft"]
        );
    }

    #[tokio::test]
    async fn filter_and_count_share_inclusive_bounds() {
        let (store, _) = seeded().await;
        let range = PriceRange::default();
        let items = store.filter_courses(&range, 10).await.unwrap();
        assert!(items.iter().all(|c| range.contains(c.price)));
        assert_eq!(items.len(), 4);
        assert_eq!(store.count_courses(&range).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn facets_cover_full_filtered_set() {
        let (store, _) = seeded().await;
        let facets = store
            .course_facets(
                &PriceRange::new(0.0, 10_000_000.0),
                &FacetOptions {
                    limit: 2,
                    price_buckets: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(facets.items.len(), 2);
        assert_eq!(facets.total, 5);
        assert_eq!(facets.by_level.iter().map(|l| l.count).sum::<i64>(), 5);

        let buckets = facets.price_buckets.unwrap();
        assert_eq!(buckets.iter().map(|b| b.count).sum::<i64>(), 5);
        assert_eq!(buckets[0].key, BucketKey::Boundary(100_000));
        assert!(buckets
            .iter()
            .any(|b| b.key == BucketKey::Boundary(1_000_000) && b.count == 1));
    }

    #[tokio::test]
    async fn duplicate_slug_is_skipped() {
        let (store, courses) = seeded().await;
        let mut copy = courses[0].clone();
        copy.id = CourseId::generate();
        let inserted = store.insert_courses(&[copy]).await.unwrap();
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn tag_counts_tie_break_by_name() {
        let (store, _) = seeded().await;
        let tags = store.count_courses_by_tag(None).await.unwrap();
        assert_eq!(tags[0].tag, "node");
        assert_eq!(tags[1].tag, "rust");
        assert_eq!(tags[0].count, 2);
    }

    #[tokio::test]
    async fn level_query_excludes_missing_level() {
        let (store, _) = seeded().await;
        let query = CourseQuery::all()
            .with_levels([Level::Beginner])
            .with_tags(TagMatch::Any(vec!["rust".to_string()]));
        let found = store.find_courses(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Rust Basics");
    }

    #[tokio::test]
    async fn join_keeps_courses_without_enrollments() {
        let (store, courses) = seeded().await;
        let user = UserId::generate();
        store
            .insert_enrollments(&[
                enrollment(user, courses[0].id, 3),
                enrollment(UserId::generate(), courses[0].id, 1),
            ])
            .await
            .unwrap();

        let joined = store
            .courses_with_enrollments(&EnrollmentFilter {
                user_id: Some(user),
                ..EnrollmentFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(joined.len(), courses.len());
        let rust = joined.iter().find(|j| j.course.id == courses[0].id).unwrap();
        assert_eq!(rust.enrollment_count, 1);
        assert!(joined
            .iter()
            .filter(|j| j.course.id != courses[0].id)
            .all(|j| j.enrollments.is_empty()));
    }

    #[tokio::test]
    async fn recent_activity_counts_distinct_students() {
        let (store, courses) = seeded().await;
        let user = UserId::generate();
        store
            .insert_enrollments(&[
                enrollment(user, courses[1].id, 1),
                enrollment(user, courses[1].id, 2),
                enrollment(UserId::generate(), courses[2].id, 2),
                enrollment(UserId::generate(), courses[2].id, 40),
            ])
            .await
            .unwrap();

        let rows = store
            .recent_enrollment_activity(&ActivityWindow {
                since: Utc::now() - Duration::days(7),
                limit: 5,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].course_id, courses[1].id);
        assert_eq!(rows[0].enrollments, 2);
        assert_eq!(rows[0].students, 1);
        assert_eq!(rows[0].title.as_deref(), Some("Mongo Deep Dive"));
    }

    #[tokio::test]
    async fn revenue_counts_paid_orders_inside_window() {
        let (store, courses) = seeded().await;
        store
            .insert_orders(&[
                order(courses[1].id, 100_000.0, OrderStatus::Paid, 2),
                order(courses[1].id, 200_000.0, OrderStatus::Paid, 3),
                order(courses[0].id, 300_000.0, OrderStatus::Paid, 1),
                order(courses[1].id, 900_000.0, OrderStatus::Refunded, 1),
                order(courses[2].id, 900_000.0, OrderStatus::Paid, 45),
                order(courses[3].id, 50_000.0, OrderStatus::Paid, 1),
            ])
            .await
            .unwrap();

        let window = |limit| ActivityWindow {
            since: Utc::now() - Duration::days(30),
            limit,
        };
        let rows = store.revenue_by_course(&window(10)).await.unwrap();
        let ranked: Vec<_> = rows.iter().map(|r| (r.course_id, r.revenue, r.orders)).collect();
        assert_eq!(
            ranked,
            vec![
                (courses[0].id, 300_000.0, 1),
                (courses[1].id, 300_000.0, 2),
                (courses[3].id, 50_000.0, 1),
            ]
        );
        assert_eq!(rows[0].title.as_deref(), Some("Rust Basics"));

        let rows = store.revenue_by_course(&window(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].course_id, courses[1].id);
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.ping().await.unwrap_err().is_unavailable());
        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn lesson_count_requires_existing_course() {
        let (store, courses) = seeded().await;
        store.set_lesson_count(courses[0].id, 7).await.unwrap();
        let course = store.get_course(courses[0].id).await.unwrap().unwrap();
        assert_eq!(course.stats.lesson_count, 7);

        let err = store
            .set_lesson_count(CourseId::generate(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
