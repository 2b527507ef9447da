//! Request inputs and results for catalog operations.
//!
//! Inputs arrive loosely typed (optional fields, numbers sent as strings,
//! ids as hex text). Each input type converts itself into the strict query
//! types of [`lms_store`] in one step, reporting every bad field at once.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use lms_core::{CourseId, EnrollmentStatus, IdError, Level, UserId};
use lms_store::{
    ActivityWindow, CourseFacets, CourseQuery, EnrollmentFilter, PriceRange, ProgressFilter,
    TagMatch,
};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Checker, Result};

/// Page size used when the client gives none.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest accepted page size; larger requests are capped.
pub const MAX_LIMIT: u32 = 100;

/// Longest accepted activity window, in days.
pub const MAX_WINDOW_DAYS: u32 = 3650;

// =============================================================================
// Loose scalars
// =============================================================================

/// A number that may have been sent as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    /// A JSON number.
    Number(f64),
    /// A string expected to hold a number.
    Text(String),
}

impl NumberLike {
    /// The finite numeric value, if there is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|n| n.is_finite())
    }
}

impl From<f64> for NumberLike {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumberLike {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

fn non_negative(
    field: &str,
    value: Option<&NumberLike>,
    default: f64,
) -> std::result::Result<f64, String> {
    let Some(value) = value else {
        return Ok(default);
    };
    let n = value
        .as_f64()
        .ok_or_else(|| format!("{field} must be a number"))?;
    if n < 0.0 {
        return Err(format!("{field} must not be negative"));
    }
    Ok(n)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn positive_int(
    field: &str,
    value: Option<&NumberLike>,
    default: u32,
    cap: u32,
) -> std::result::Result<u32, String> {
    let Some(value) = value else {
        return Ok(default);
    };
    let n = value
        .as_f64()
        .ok_or_else(|| format!("{field} must be a number"))?;
    if n.fract() != 0.0 || n < 1.0 {
        return Err(format!("{field} must be a positive integer"));
    }
    Ok(if n >= f64::from(cap) { cap } else { n as u32 })
}

/// Parse an optional id, treating a blank value as absent.
fn optional_id<T>(field: &str, value: Option<&str>) -> std::result::Result<Option<T>, String>
where
    T: FromStr<Err = IdError>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("{field} is invalid")),
    }
}

/// Parse a required course id given as text.
///
/// # Errors
///
/// Returns `CatalogError::Validation` for missing, blank or malformed ids.
pub fn parse_course_id(field: &str, value: Option<&str>) -> Result<CourseId> {
    let Some(raw) = value else {
        return Err(CatalogError::invalid(field, format!("{field} is required")));
    };
    CourseId::parse(raw).map_err(|err| match err {
        IdError::Empty => CatalogError::invalid(field, format!("{field} is required")),
        IdError::Malformed(_) => CatalogError::invalid(field, format!("{field} is invalid")),
    })
}

// =============================================================================
// Inputs
// =============================================================================

/// Body of the price filter endpoints: `{ min, max, limit }`, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterInput {
    /// Lower price bound (inclusive).
    #[serde(default)]
    pub min: Option<NumberLike>,
    /// Upper price bound (inclusive).
    #[serde(default)]
    pub max: Option<NumberLike>,
    /// Page size.
    #[serde(default)]
    pub limit: Option<NumberLike>,
}

/// A validated price filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterRequest {
    /// Price range.
    pub range: PriceRange,
    /// Page size, `1..=MAX_LIMIT`.
    pub limit: u32,
}

impl FilterInput {
    /// Coerce and validate the filter.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` naming each non-numeric or negative
    /// bound, a non-integer limit, or `min > max`.
    pub fn resolve(&self) -> Result<FilterRequest> {
        let mut checker = Checker::default();
        let min = checker.check(
            "min",
            non_negative("min", self.min.as_ref(), PriceRange::DEFAULT_MIN),
        );
        let max = checker.check(
            "max",
            non_negative("max", self.max.as_ref(), PriceRange::DEFAULT_MAX),
        );
        let limit = checker.check(
            "limit",
            positive_int("limit", self.limit.as_ref(), DEFAULT_LIMIT, MAX_LIMIT),
        );
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                checker.reject("min", "min must not exceed max");
            }
        }
        checker.finish()?;

        Ok(FilterRequest {
            range: PriceRange::new(
                min.unwrap_or(PriceRange::DEFAULT_MIN),
                max.unwrap_or(PriceRange::DEFAULT_MAX),
            ),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// Body naming one course: `{ courseId }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseIdInput {
    /// Hex object id of the course.
    #[serde(default)]
    pub course_id: Option<String>,
}

impl CourseIdInput {
    /// Input for the given id.
    #[must_use]
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: Some(course_id.into()),
        }
    }

    /// The parsed course id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for missing, blank or malformed ids.
    pub fn course_id(&self) -> Result<CourseId> {
        parse_course_id("courseId", self.course_id.as_deref())
    }
}

/// Query parameters of the course/enrollment join: `userId`, `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentQuery {
    /// Only enrollments of this user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Only enrollments in this state.
    #[serde(default)]
    pub status: Option<String>,
}

impl EnrollmentQuery {
    /// Validate into an enrollment filter.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a malformed user id or an
    /// unknown status.
    pub fn to_filter(&self) -> Result<EnrollmentFilter> {
        let mut checker = Checker::default();
        let user_id = checker
            .check("userId", optional_id::<UserId>("userId", self.user_id.as_deref()))
            .flatten();
        let status = checker
            .check(
                "status",
                match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    None => Ok(None),
                    Some(raw) => raw
                        .parse::<EnrollmentStatus>()
                        .map(Some)
                        .map_err(|_| {
                            format!("status must be one of {}", EnrollmentStatus::NAMES.join(", "))
                        }),
                },
            )
            .flatten();
        checker.finish()?;

        Ok(EnrollmentFilter {
            course_id: None,
            user_id,
            status,
        })
    }
}

/// Query parameters of the progress totals: `userId`, `courseId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    /// Only progress of this user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Only progress in this course.
    #[serde(default)]
    pub course_id: Option<String>,
}

impl ProgressQuery {
    /// Validate into a progress filter.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for malformed ids.
    pub fn to_filter(&self) -> Result<ProgressFilter> {
        let mut checker = Checker::default();
        let user_id = checker
            .check("userId", optional_id::<UserId>("userId", self.user_id.as_deref()))
            .flatten();
        let course_id = checker
            .check(
                "courseId",
                optional_id::<CourseId>("courseId", self.course_id.as_deref()),
            )
            .flatten();
        checker.finish()?;
        Ok(ProgressFilter { user_id, course_id })
    }
}

/// Defaults of an activity ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityDefaults {
    /// Window length in days.
    pub days: u32,
    /// Number of ranked rows.
    pub limit: u32,
}

impl ActivityDefaults {
    /// Recent enrollment activity: one week, top 5.
    pub const RECENT_ENROLLMENTS: Self = Self { days: 7, limit: 5 };

    /// Revenue ranking: 30 days, top 10.
    pub const REVENUE: Self = Self {
        days: 30,
        limit: 10,
    };
}

/// Body of the activity rankings: `{ days, limit }`, both optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityInput {
    /// Trailing window length in days.
    #[serde(default)]
    pub days: Option<NumberLike>,
    /// Number of ranked rows.
    #[serde(default)]
    pub limit: Option<NumberLike>,
}

impl ActivityInput {
    /// Validate into a window ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for non-integer or non-positive
    /// values.
    pub fn to_window(
        &self,
        defaults: ActivityDefaults,
        now: DateTime<Utc>,
    ) -> Result<ActivityWindow> {
        let mut checker = Checker::default();
        let days = checker.check(
            "days",
            positive_int("days", self.days.as_ref(), defaults.days, MAX_WINDOW_DAYS),
        );
        let limit = checker.check(
            "limit",
            positive_int("limit", self.limit.as_ref(), defaults.limit, MAX_LIMIT),
        );
        checker.finish()?;

        let days = days.unwrap_or(defaults.days);
        Ok(ActivityWindow {
            since: now - Duration::days(i64::from(days)),
            limit: limit.unwrap_or(defaults.limit),
        })
    }
}

// =============================================================================
// Presets
// =============================================================================

/// The canned course listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoursePreset {
    /// Beginner or advanced courses, newest five.
    Ex1,
    /// Courses tagged `react` or `nextjs`.
    Ex2,
    /// Courses tagged both `mongodb` and `node`, priced up to 500000.
    Ex3,
}

impl CoursePreset {
    /// The listing query of this preset.
    #[must_use]
    pub fn query(self) -> CourseQuery {
        match self {
            Self::Ex1 => CourseQuery::all()
                .with_levels([Level::Beginner, Level::Advanced])
                .with_limit(5),
            Self::Ex2 => CourseQuery::all().with_tags(TagMatch::Any(vec![
                "react".to_string(),
                "nextjs".to_string(),
            ])),
            Self::Ex3 => CourseQuery::all()
                .with_tags(TagMatch::All(vec![
                    "mongodb".to_string(),
                    "node".to_string(),
                ]))
                .with_price(PriceRange::new(0.0, 500_000.0)),
        }
    }

    /// Short name used in logs and messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ex1 => "ex1",
            Self::Ex2 => "ex2",
            Self::Ex3 => "ex3",
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// One page of results together with the size of the whole result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The page.
    pub items: Vec<T>,
    /// Size of the whole result set.
    pub total: u64,
}

/// Faceted search results together with an independently counted total.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPage {
    /// The facet sets.
    pub facets: CourseFacets,
    /// Size of the filtered set, from a separate count.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(json: &str) -> FilterInput {
        serde_json::from_str(json).unwrap()
    }

    fn field_errors(err: CatalogError) -> Vec<String> {
        match err {
            CatalogError::Validation(fields) => fields.into_keys().collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_uses_defaults() {
        let request = filter("{}").resolve().unwrap();
        assert_eq!(request.range, PriceRange::new(100_000.0, 200_000.0));
        assert_eq!(request.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let request = filter(r#"{"min": "0", "max": " 500000 ", "limit": "3"}"#)
            .resolve()
            .unwrap();
        assert_eq!(request.range, PriceRange::new(0.0, 500_000.0));
        assert_eq!(request.limit, 3);
    }

    #[test]
    fn null_fields_use_defaults() {
        let request = filter(r#"{"min": null, "limit": null}"#).resolve().unwrap();
        assert_eq!(request.range.min, PriceRange::DEFAULT_MIN);
        assert_eq!(request.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn every_bad_field_is_reported() {
        let err = filter(r#"{"min": "abc", "max": "x", "limit": 0}"#)
            .resolve()
            .unwrap_err();
        assert_eq!(field_errors(err), vec!["limit", "max", "min"]);
    }

    #[test]
    fn fractional_limit_is_rejected() {
        let err = filter(r#"{"limit": 2.5}"#).resolve().unwrap_err();
        assert_eq!(field_errors(err), vec!["limit"]);
    }

    #[test]
    fn large_limit_is_capped() {
        let request = filter(r#"{"limit": 5000}"#).resolve().unwrap();
        assert_eq!(request.limit, MAX_LIMIT);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = filter(r#"{"min": 300000, "max": 100000}"#)
            .resolve()
            .unwrap_err();
        assert_eq!(field_errors(err), vec!["min"]);
    }

    #[test]
    fn negative_bound_is_rejected() {
        let err = filter(r#"{"min": -1}"#).resolve().unwrap_err();
        assert_eq!(field_errors(err), vec!["min"]);
    }

    #[test]
    fn course_id_shapes() {
        assert!(CourseIdInput::default().course_id().is_err());
        assert!(CourseIdInput::new("").course_id().is_err());
        assert!(CourseIdInput::new("not-an-id").course_id().is_err());

        let id = CourseId::generate();
        assert_eq!(CourseIdInput::new(id.to_hex()).course_id().unwrap(), id);
    }

    #[test]
    fn course_id_reason_distinguishes_missing_and_malformed() {
        let missing = CourseIdInput::new("  ").course_id().unwrap_err();
        let malformed = CourseIdInput::new("123").course_id().unwrap_err();
        assert!(missing.to_string().contains("required"));
        assert!(malformed.to_string().contains("invalid"));
    }

    #[test]
    fn enrollment_query_validates_vocabulary() {
        let query = EnrollmentQuery {
            user_id: None,
            status: Some("pending".to_string()),
        };
        assert_eq!(field_errors(query.to_filter().unwrap_err()), vec!["status"]);

        let user = UserId::generate();
        let filter = EnrollmentQuery {
            user_id: Some(user.to_hex()),
            status: Some("refund".to_string()),
        }
        .to_filter()
        .unwrap();
        assert_eq!(filter.user_id, Some(user));
        assert_eq!(filter.status, Some(EnrollmentStatus::Refund));
    }

    #[test]
    fn blank_query_params_are_absent() {
        let filter = EnrollmentQuery {
            user_id: Some(String::new()),
            status: Some(String::new()),
        }
        .to_filter()
        .unwrap();
        assert_eq!(filter, EnrollmentFilter::default());
    }

    #[test]
    fn progress_query_rejects_malformed_ids() {
        let query = ProgressQuery {
            user_id: Some("zz".to_string()),
            course_id: Some("yy".to_string()),
        };
        assert_eq!(
            field_errors(query.to_filter().unwrap_err()),
            vec!["courseId", "userId"]
        );
    }

    #[test]
    fn activity_window_defaults() {
        let now = Utc::now();
        let window = ActivityInput::default()
            .to_window(ActivityDefaults::RECENT_ENROLLMENTS, now)
            .unwrap();
        assert_eq!(window.since, now - Duration::days(7));
        assert_eq!(window.limit, 5);

        let window = ActivityInput {
            days: Some("30".into()),
            limit: Some(3.0.into()),
        }
        .to_window(ActivityDefaults::RECENT_ENROLLMENTS, now)
        .unwrap();
        assert_eq!(window.since, now - Duration::days(30));
        assert_eq!(window.limit, 3);
    }

    #[test]
    fn revenue_window_defaults_and_rejects_bad_values() {
        let now = Utc::now();
        let window = ActivityInput::default()
            .to_window(ActivityDefaults::REVENUE, now)
            .unwrap();
        assert_eq!(window.since, now - Duration::days(30));
        assert_eq!(window.limit, 10);

        let err = ActivityInput {
            days: Some("soon".into()),
            limit: Some(0.0.into()),
        }
        .to_window(ActivityDefaults::REVENUE, now)
        .unwrap_err();
        assert_eq!(field_errors(err), vec!["days", "limit"]);
    }

    #[test]
    fn presets_build_expected_queries() {
        let ex1 = CoursePreset::Ex1.query();
        assert_eq!(ex1.levels, vec![Level::Beginner, Level::Advanced]);
        assert_eq!(ex1.limit, Some(5));

        assert!(matches!(CoursePreset::Ex2.query().tags, Some(TagMatch::Any(_))));

        let ex3 = CoursePreset::Ex3.query();
        assert!(matches!(ex3.tags, Some(TagMatch::All(_))));
        assert_eq!(ex3.price, Some(PriceRange::new(0.0, 500_000.0)));
    }
}
