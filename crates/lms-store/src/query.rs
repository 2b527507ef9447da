//! Typed query inputs accepted by the [`Store`](crate::Store).
//!
//! These carry already-validated values only; coercion of client input
//! happens before a query is built.

use chrono::{DateTime, Utc};
use lms_core::{CourseId, EnrollmentStatus, Level, UserId};

/// Inclusive price range, `min <= price <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl PriceRange {
    /// Lower bound used when the client gives none.
    pub const DEFAULT_MIN: f64 = 100_000.0;
    /// Upper bound used when the client gives none.
    pub const DEFAULT_MAX: f64 = 200_000.0;

    /// Create a range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `price` falls inside the range.
    #[must_use]
    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN, Self::DEFAULT_MAX)
    }
}

/// How a tag list is matched against a course's tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch {
    /// At least one listed tag is present.
    Any(Vec<String>),
    /// Every listed tag is present.
    All(Vec<String>),
}

impl TagMatch {
    /// Whether `tags` satisfies this match.
    #[must_use]
    pub fn matches(&self, tags: &[String]) -> bool {
        match self {
            Self::Any(wanted) => wanted.is_empty() || wanted.iter().any(|t| tags.contains(t)),
            Self::All(wanted) => wanted.iter().all(|t| tags.contains(t)),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Any(tags) | Self::All(tags) => tags.is_empty(),
        }
    }
}

/// Filter for course listings. Empty fields match everything.
///
/// Results are always ordered by `publishedAt` descending with the id
/// descending as tie-break.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseQuery {
    /// Allowed levels; empty means any level.
    pub levels: Vec<Level>,
    /// Tag constraint.
    pub tags: Option<TagMatch>,
    /// Price constraint.
    pub price: Option<PriceRange>,
    /// Maximum number of results.
    pub limit: Option<u32>,
}

impl CourseQuery {
    /// A query that matches every course.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given levels.
    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Restrict by tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagMatch) -> Self {
        self.tags = Some(tags).filter(|t| !t.is_empty());
        self
    }

    /// Restrict by price.
    #[must_use]
    pub const fn with_price(mut self, range: PriceRange) -> Self {
        self.price = Some(range);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filter applied to enrollments, either directly or inside a course join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentFilter {
    /// Restrict to one course.
    pub course_id: Option<CourseId>,
    /// Restrict to one user.
    pub user_id: Option<UserId>,
    /// Restrict to one status.
    pub status: Option<EnrollmentStatus>,
}

/// Filter for progress totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressFilter {
    /// Restrict to one user.
    pub user_id: Option<UserId>,
    /// Restrict to one course.
    pub course_id: Option<CourseId>,
}

/// A trailing time window with a result cap, used by activity rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    /// Only records at or after this instant count.
    pub since: DateTime<Utc>,
    /// Maximum number of ranked rows.
    pub limit: u32,
}

/// Options for a faceted course search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetOptions {
    /// Page size of the `items` facet.
    pub limit: u32,
    /// Whether to compute the price distribution facet.
    pub price_buckets: bool,
}
