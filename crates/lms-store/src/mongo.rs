//! MongoDB storage implementation.
//!
//! This module provides the `MongoStore` implementation of the `Store` trait.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use lms_core::CourseId;
use mongodb::error::ErrorKind;
use mongodb::options::{AggregateOptions, ClientOptions, FindOptions, InsertManyOptions};
use mongodb::{Client, Collection, Database};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::pipeline;
use crate::query::{
    ActivityWindow, CourseQuery, EnrollmentFilter, FacetOptions, PriceRange, ProgressFilter,
};
use crate::schema::{all_collections, collection, indexes_for};
use crate::types::{
    Course, CourseActivity, CourseDuration, CourseFacets, CourseRevenue, CourseStudents,
    CourseSummary, CourseWithEnrollments, Enrollment, IndexDescription, Lesson, LevelCount,
    LevelTotal, Order, PriceBucket, Progress, ProgressTotals, TagCount,
};
use crate::Store;

/// Server error code for a missing collection.
const NAMESPACE_NOT_FOUND: i32 = 26;

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed storage implementation.
///
/// The store keeps one client for the whole process. When an operation fails
/// because the server became unreachable, the client is rebuilt so the next
/// operation starts from a fresh connection pool. The failed operation itself
/// is not retried.
pub struct MongoStore {
    options: ClientOptions,
    database: String,
    client: RwLock<Client>,
}

impl MongoStore {
    /// Connect to the server at `uri` and use `database`.
    ///
    /// The connection is established lazily; call [`Store::ping`] to check
    /// reachability.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI cannot be parsed.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if options.app_name.is_none() {
            options.app_name = Some("lms".to_string());
        }
        Self::with_options(options, database)
    }

    /// Create a store from already parsed client options.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn with_options(options: ClientOptions, database: &str) -> Result<Self> {
        let client =
            Client::with_options(options.clone()).map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self {
            options,
            database: database.to_string(),
            client: RwLock::new(client),
        })
    }

    fn db(&self) -> Database {
        self.client.read().database(&self.database)
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db().collection::<T>(name)
    }

    /// Map a driver error, replacing the client when the connection is gone.
    fn observe(&self, err: mongodb::error::Error) -> StoreError {
        let lost = matches!(
            err.kind.as_ref(),
            ErrorKind::ServerSelection { .. }
                | ErrorKind::Io(_)
                | ErrorKind::ConnectionPoolCleared { .. }
        );
        if !lost {
            return StoreError::Database(err.to_string());
        }

        tracing::warn!(error = %err, "database connection lost, rebuilding client");
        match Client::with_options(self.options.clone()) {
            Ok(client) => *self.client.write() = client,
            Err(rebuild) => tracing::error!(error = %rebuild, "failed to rebuild database client"),
        }
        StoreError::Unavailable(err.to_string())
    }

    async fn find<T>(&self, name: &str, filter: Document, options: FindOptions) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self
            .collection::<T>(name)
            .find(filter, options)
            .await
            .map_err(|e| self.observe(e))?;
        cursor.try_collect().await.map_err(|e| self.observe(e))
    }

    async fn aggregate_raw(&self, name: &str, stages: Vec<Document>) -> Result<Vec<Document>> {
        tracing::debug!(collection = name, stages = stages.len(), "running aggregation");
        let options = AggregateOptions::builder().allow_disk_use(true).build();
        let cursor = self
            .collection::<Document>(name)
            .aggregate(stages, options)
            .await
            .map_err(|e| self.observe(e))?;
        cursor.try_collect().await.map_err(|e| self.observe(e))
    }

    async fn aggregate<T: DeserializeOwned>(
        &self,
        name: &str,
        stages: Vec<Document>,
    ) -> Result<Vec<T>> {
        self.aggregate_raw(name, stages)
            .await?
            .into_iter()
            .map(|doc| bson::from_document(doc).map_err(StoreError::from))
            .collect()
    }

    async fn insert<T>(&self, name: &str, records: &[T]) -> Result<u64>
    where
        T: Serialize + Send + Sync,
    {
        let len = records.len();
        if len == 0 {
            return Ok(0);
        }
        let options = InsertManyOptions::builder().ordered(false).build();
        match self.collection::<T>(name).insert_many(records, options).await {
            Ok(result) => Ok(result.inserted_ids.len() as u64),
            Err(err) => match duplicate_count(&err) {
                Some(skipped) => {
                    tracing::warn!(collection = name, skipped, "skipped duplicate records");
                    Ok((len - skipped) as u64)
                }
                None => Err(self.observe(err)),
            },
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        match self.collection::<Document>(name).drop(None).await {
            Ok(()) => Ok(()),
            Err(err) if command_code(&err) == Some(NAMESPACE_NOT_FOUND) => Ok(()),
            Err(err) => Err(self.observe(err)),
        }
    }

    async fn create_indexes(&self, name: &str) -> Result<()> {
        let models = indexes_for(name);
        if models.is_empty() {
            return Ok(());
        }
        let count = models.len();
        self.collection::<Document>(name)
            .create_indexes(models, None)
            .await
            .map_err(|e| self.observe(e))?;
        tracing::debug!(collection = name, count, "indexes ensured");
        Ok(())
    }
}

fn by_id() -> FindOptions {
    FindOptions::builder().sort(doc! { "_id": 1 }).build()
}

fn command_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

/// Number of rejected records when every rejection is a duplicate key.
fn duplicate_count(err: &mongodb::error::Error) -> Option<usize> {
    let ErrorKind::BulkWrite(failure) = err.kind.as_ref() else {
        return None;
    };
    if failure.write_concern_error.is_some() {
        return None;
    }
    let errors = failure.write_errors.as_deref().unwrap_or_default();
    errors
        .iter()
        .all(|e| e.code == DUPLICATE_KEY)
        .then_some(errors.len())
}

fn decode_rows<T: DeserializeOwned>(doc: &Document, key: &str) -> Result<Vec<T>> {
    match doc.get(key) {
        Some(Bson::Array(rows)) => rows
            .iter()
            .map(|row| bson::from_bson(row.clone()).map_err(StoreError::from))
            .collect(),
        Some(other) => Err(StoreError::Serialization(format!(
            "expected array at {key}, found {:?}",
            other.element_type()
        ))),
        None => Ok(Vec::new()),
    }
}

fn count_value(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or_default(),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or_default(),
        _ => 0,
    }
}

fn decode_joined(mut doc: Document) -> Result<CourseWithEnrollments> {
    let enrollments = match doc.remove("enrollments") {
        Some(Bson::Array(rows)) => rows
            .into_iter()
            .map(|row| bson::from_bson::<Enrollment>(row).map_err(StoreError::from))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    doc.remove("enrollmentCount");
    let course: Course = bson::from_document(doc)?;
    Ok(CourseWithEnrollments::new(course, enrollments))
}

#[async_trait]
impl Store for MongoStore {
    // =========================================================================
    // Connection
    // =========================================================================

    async fn ping(&self) -> Result<()> {
        self.db()
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| self.observe(e))?;
        Ok(())
    }

    async fn sync_indexes(&self) -> Result<()> {
        for name in all_collections() {
            self.create_indexes(name).await?;
        }
        tracing::info!(database = %self.database, "indexes synchronized");
        Ok(())
    }

    // =========================================================================
    // Courses
    // =========================================================================

    async fn find_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        let options = FindOptions::builder()
            .sort(pipeline::course_sort())
            .limit(query.limit.map(i64::from))
            .build();
        self.find(collection::COURSES, pipeline::course_filter(query), options).await
    }

    async fn explain_courses(&self, query: &CourseQuery) -> Result<Document> {
        self.db()
            .run_command(pipeline::explain_course_find(query), None)
            .await
            .map_err(|e| self.observe(e))
    }

    async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>> {
        self.collection::<Course>(collection::COURSES)
            .find_one(doc! { "_id": course_id }, None)
            .await
            .map_err(|e| self.observe(e))
    }

    async fn course_indexes(&self) -> Result<Vec<IndexDescription>> {
        let cursor = self
            .collection::<Document>(collection::COURSES)
            .list_indexes(None)
            .await
            .map_err(|e| self.observe(e))?;
        let models: Vec<_> = cursor.try_collect().await.map_err(|e| self.observe(e))?;
        Ok(models
            .into_iter()
            .map(|model| {
                let options = model.options.unwrap_or_default();
                IndexDescription {
                    name: options.name,
                    keys: model.keys,
                    unique: options.unique.unwrap_or(false),
                }
            })
            .collect())
    }

    async fn courses_with_enrollments(
        &self,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<CourseWithEnrollments>> {
        self.aggregate_raw(
            collection::COURSES,
            pipeline::courses_with_enrollments(filter),
        )
        .await?
        .into_iter()
        .map(decode_joined)
        .collect()
    }

    async fn filter_courses(&self, range: &PriceRange, limit: u32) -> Result<Vec<CourseSummary>> {
        self.aggregate(collection::COURSES, pipeline::filtered_courses(range, limit)).await
    }

    async fn count_courses(&self, range: &PriceRange) -> Result<u64> {
        let rows = self
            .aggregate_raw(collection::COURSES, pipeline::count_courses(range))
            .await?;
        Ok(rows
            .first()
            .map_or(0, |row| count_value(row, "totalCount")))
    }

    async fn course_facets(
        &self,
        range: &PriceRange,
        options: &FacetOptions,
    ) -> Result<CourseFacets> {
        let rows = self
            .aggregate_raw(collection::COURSES, pipeline::course_facets(range, options))
            .await?;
        let facets = rows.into_iter().next().unwrap_or_default();

        let total = decode_rows::<Document>(&facets, "totalCount")?
            .first()
            .map_or(0, |row| count_value(row, "value"));
        let price_buckets = if options.price_buckets {
            Some(decode_rows::<PriceBucket>(&facets, "priceBuckets")?)
        } else {
            None
        };

        Ok(CourseFacets {
            items: decode_rows(&facets, "items")?,
            by_level: decode_rows(&facets, "byLevel")?,
            top_tags: decode_rows(&facets, "topTags")?,
            price_buckets,
            total,
        })
    }

    // =========================================================================
    // Lessons
    // =========================================================================

    async fn find_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        let options = FindOptions::builder().sort(pipeline::lesson_sort()).build();
        self.find(
            collection::LESSONS,
            pipeline::lesson_filter(course_id),
            options,
        )
        .await
    }

    async fn aggregate_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        self.aggregate(collection::LESSONS, pipeline::lessons_by_course(course_id)).await
    }

    // =========================================================================
    // Progress
    // =========================================================================

    async fn progress_totals(&self, filter: &ProgressFilter) -> Result<Vec<ProgressTotals>> {
        self.aggregate(collection::PROGRESS, pipeline::progress_totals(filter)).await
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    async fn count_courses_by_level(&self) -> Result<Vec<LevelTotal>> {
        self.aggregate(collection::COURSES, pipeline::count_courses_by_level()).await
    }

    async fn top_levels(&self, limit: u32) -> Result<Vec<LevelCount>> {
        self.aggregate(collection::COURSES, pipeline::top_levels(limit)).await
    }

    async fn count_courses_by_tag(&self, limit: Option<u32>) -> Result<Vec<TagCount>> {
        self.aggregate(collection::COURSES, pipeline::count_courses_by_tag(limit)).await
    }

    async fn count_active_students(&self, course_id: CourseId) -> Result<Vec<CourseStudents>> {
        self.aggregate(
            collection::ENROLLMENTS,
            pipeline::count_active_students(course_id),
        )
        .await
    }

    async fn total_completed_duration(&self, course_id: CourseId) -> Result<Vec<CourseDuration>> {
        self.aggregate(
            collection::PROGRESS,
            pipeline::total_completed_duration(course_id),
        )
        .await
    }

    async fn recent_enrollment_activity(
        &self,
        window: &ActivityWindow,
    ) -> Result<Vec<CourseActivity>> {
        self.aggregate(
            collection::ENROLLMENTS,
            pipeline::recent_enrollment_activity(window),
        )
        .await
    }

    async fn revenue_by_course(&self, window: &ActivityWindow) -> Result<Vec<CourseRevenue>> {
        self.aggregate(collection::ORDERS, pipeline::revenue_by_course(window)).await
    }

    // =========================================================================
    // Raw listings
    // =========================================================================

    async fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
        self.find(collection::ENROLLMENTS, Document::new(), by_id()).await
    }

    async fn list_progress(&self) -> Result<Vec<Progress>> {
        self.find(collection::PROGRESS, Document::new(), by_id()).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.find(collection::ORDERS, Document::new(), by_id()).await
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        self.find(collection::LESSONS, Document::new(), by_id()).await
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    async fn reset_collection(&self, name: &str) -> Result<()> {
        self.drop_collection(name).await?;
        self.create_indexes(name).await?;
        tracing::info!(collection = name, "collection reset");
        Ok(())
    }

    async fn insert_courses(&self, courses: &[Course]) -> Result<u64> {
        self.insert(collection::COURSES, courses).await
    }

    async fn insert_lessons(&self, lessons: &[Lesson]) -> Result<u64> {
        self.insert(collection::LESSONS, lessons).await
    }

    async fn insert_enrollments(&self, enrollments: &[Enrollment]) -> Result<u64> {
        self.insert(collection::ENROLLMENTS, enrollments).await
    }

    async fn insert_orders(&self, orders: &[Order]) -> Result<u64> {
        self.insert(collection::ORDERS, orders).await
    }

    async fn insert_progress(&self, progress: &[Progress]) -> Result<u64> {
        self.insert(collection::PROGRESS, progress).await
    }

    async fn set_lesson_count(&self, course_id: CourseId, count: i64) -> Result<()> {
        let result = self
            .collection::<Document>(collection::COURSES)
            .update_one(
                doc! { "_id": course_id },
                doc! { "$set": { "stats.lessonCount": count } },
                None,
            )
            .await
            .map_err(|e| self.observe(e))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
