//! Seeding steps run against a [`Store`].
//!
//! Each step checks its prerequisites, resets its collection (drop plus
//! index creation), inserts freshly generated records and logs a sample.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use lms_core::CourseId;
use lms_store::schema::collection;
use lms_store::{CourseQuery, Store, StoreError};

use crate::generate;

/// Courses that receive generated lessons.
pub const LESSON_COURSES: u32 = 10;

/// Number of records echoed to the log after each step.
const SAMPLE: usize = 5;

/// Errors that abort a seeding run.
#[derive(Debug, Error)]
pub enum SeedError {
    /// A collection this step reads from is empty.
    #[error("no {0} found, seed {0} first")]
    MissingPrerequisite(&'static str),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result of a seeding step.
pub type Result<T> = std::result::Result<T, SeedError>;

/// Runs seeding steps with one RNG and one reference time.
pub struct Seeder<'a, S, R> {
    store: &'a S,
    rng: R,
    now: DateTime<Utc>,
}

impl<'a, S, R> Seeder<'a, S, R>
where
    S: Store,
    R: Rng,
{
    /// Create a seeder.
    pub fn new(store: &'a S, rng: R, now: DateTime<Utc>) -> Self {
        Self { store, rng, now }
    }

    async fn course_ids(&self, limit: Option<u32>) -> Result<Vec<CourseId>> {
        let mut query = CourseQuery::all();
        if let Some(limit) = limit {
            query = query.with_limit(limit);
        }
        let ids: Vec<_> = self
            .store
            .find_courses(&query)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if ids.is_empty() {
            return Err(SeedError::MissingPrerequisite(collection::COURSES));
        }
        Ok(ids)
    }

    /// Replace the courses collection with `count` generated courses.
    ///
    /// # Errors
    ///
    /// Returns an error if a database call fails.
    pub async fn courses(&mut self, count: usize) -> Result<u64> {
        self.store.reset_collection(collection::COURSES).await?;
        let courses = generate::courses(&mut self.rng, count, self.now);
        let inserted = self.store.insert_courses(&courses).await?;
        tracing::info!(inserted, "Inserted courses");

        for c in courses.iter().take(SAMPLE) {
            tracing::info!(
                title = %c.title,
                slug = %c.slug,
                level = ?c.level,
                price = c.price,
                tags = %c.tags.join(","),
                "Sample course"
            );
        }
        Ok(inserted)
    }

    /// Replace the lessons collection with lessons for the first courses,
    /// then refresh each course's lesson count.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::MissingPrerequisite` when there are no courses.
    pub async fn lessons(&mut self) -> Result<u64> {
        let course_ids = self.course_ids(Some(LESSON_COURSES)).await?;

        self.store.reset_collection(collection::LESSONS).await?;
        let lessons = generate::lessons(&mut self.rng, &course_ids, self.now);
        let inserted = self.store.insert_lessons(&lessons).await?;
        tracing::info!(inserted, "Inserted lessons");

        for (course_id, count) in generate::lesson_counts(&lessons) {
            self.store.set_lesson_count(course_id, count).await?;
        }
        tracing::info!(courses = course_ids.len(), "Updated course lesson counts");

        for l in lessons.iter().take(SAMPLE) {
            tracing::info!(
                title = %l.title,
                lesson_type = %l.lesson_type.as_str(),
                course_id = %l.course_id,
                order = l.order,
                free = l.is_free,
                published = l.is_published,
                "Sample lesson"
            );
        }

        let mut by_type: BTreeMap<&str, (u64, i64)> = BTreeMap::new();
        for l in &lessons {
            let entry = by_type.entry(l.lesson_type.as_str()).or_default();
            entry.0 += 1;
            entry.1 += l.stats.views;
        }
        for (lesson_type, (count, views)) in by_type {
            tracing::info!(
                lesson_type,
                count,
                total_views = views,
                "Lessons by type"
            );
        }
        Ok(inserted)
    }

    /// Replace the enrollments collection for `users` generated users.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::MissingPrerequisite` when there are no courses.
    pub async fn enrollments(&mut self, users: usize) -> Result<u64> {
        let course_ids = self.course_ids(None).await?;

        self.store.reset_collection(collection::ENROLLMENTS).await?;
        let enrollments = generate::enrollments(&mut self.rng, &course_ids, users, self.now);
        let inserted = self.store.insert_enrollments(&enrollments).await?;
        tracing::info!(inserted, "Inserted enrollments");

        for e in enrollments.iter().take(SAMPLE) {
            tracing::info!(
                user_id = %e.user_id,
                course_id = %e.course_id,
                status = %e.status.as_str(),
                enrolled_at = %e.enrolled_at,
                "Sample enrollment"
            );
        }
        Ok(inserted)
    }

    /// Replace the orders collection for `users` generated users.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::MissingPrerequisite` when there are no courses.
    pub async fn orders(&mut self, users: usize) -> Result<u64> {
        let course_ids = self.course_ids(None).await?;

        self.store.reset_collection(collection::ORDERS).await?;
        let orders = generate::orders(&mut self.rng, &course_ids, users, self.now);
        let inserted = self.store.insert_orders(&orders).await?;
        tracing::info!(inserted, "Inserted orders");

        for o in orders.iter().take(SAMPLE) {
            tracing::info!(
                user_id = %o.user_id,
                course_id = %o.course_id,
                amount = o.amount,
                status = %o.status.as_str(),
                paid_at = %o.paid_at,
                "Sample order"
            );
        }
        Ok(inserted)
    }

    /// Replace the progress collection with entries for every enrollment.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::MissingPrerequisite` when there are no courses or
    /// no enrollments.
    pub async fn progress(&mut self) -> Result<u64> {
        self.course_ids(Some(1)).await?;
        let enrollments = self.store.list_enrollments().await?;
        if enrollments.is_empty() {
            return Err(SeedError::MissingPrerequisite(collection::ENROLLMENTS));
        }
        let lessons = self.store.list_lessons().await?;

        self.store.reset_collection(collection::PROGRESS).await?;
        let entries = generate::progress(&mut self.rng, &enrollments, &lessons, self.now);
        let inserted = self.store.insert_progress(&entries).await?;
        tracing::info!(inserted, "Inserted progress entries");

        for p in entries.iter().take(SAMPLE) {
            tracing::info!(
                user_id = %p.user_id,
                course_id = %p.course_id,
                lesson_id = %p.lesson_id,
                status = %p.status.as_str(),
                duration_sec = p.duration_sec,
                "Sample progress"
            );
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use lms_store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn seeder(store: &MemoryStore) -> Seeder<'_, MemoryStore, StdRng> {
        Seeder::new(store, StdRng::seed_from_u64(42), Utc::now())
    }

    #[tokio::test]
    async fn dependent_steps_need_courses() {
        let store = MemoryStore::new();
        let mut seeder = seeder(&store);

        let err = seeder.lessons().await.unwrap_err();
        assert!(matches!(err, SeedError::MissingPrerequisite("courses")));
        assert!(seeder.enrollments(5).await.is_err());
        assert!(seeder.orders(5).await.is_err());
        assert!(seeder.progress().await.is_err());
    }

    #[tokio::test]
    async fn progress_needs_enrollments() {
        let store = MemoryStore::new();
        let mut seeder = seeder(&store);
        seeder.courses(3).await.unwrap();

        let err = seeder.progress().await.unwrap_err();
        assert!(matches!(err, SeedError::MissingPrerequisite("enrollments")));
    }

    #[tokio::test]
    async fn full_run_fills_every_collection() {
        let store = MemoryStore::new();
        let mut seeder = seeder(&store);

        assert_eq!(seeder.courses(12).await.unwrap(), 12);
        let lessons = seeder.lessons().await.unwrap();
        assert!(lessons >= 5 * u64::from(LESSON_COURSES));
        assert!(seeder.enrollments(20).await.unwrap() >= 20);
        assert!(seeder.orders(20).await.unwrap() >= 20);
        assert!(seeder.progress().await.unwrap() >= 100);

        let courses = store.find_courses(&CourseQuery::all()).await.unwrap();
        let all_lessons = store.list_lessons().await.unwrap();
        for course in &courses {
            let count = all_lessons
                .iter()
                .filter(|l| l.course_id == course.id)
                .count() as i64;
            if count > 0 {
                assert_eq!(course.stats.lesson_count, count);
            }
        }
    }

    #[tokio::test]
    async fn reseeding_replaces_records() {
        let store = MemoryStore::new();
        let mut seeder = seeder(&store);
        seeder.courses(4).await.unwrap();
        seeder.courses(6).await.unwrap();

        let courses = store.find_courses(&CourseQuery::all()).await.unwrap();
        assert_eq!(courses.len(), 6);
    }
}
