//! Error types for catalog operations.

use std::collections::BTreeMap;

use lms_core::CourseId;
use lms_store::StoreError;
use thiserror::Error;

/// A result type using `CatalogError`.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Field name to reason, in field order.
pub type FieldErrors = BTreeMap<String, String>;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// One or more input fields were rejected before any query ran.
    #[error("invalid input: {}", describe(.0))]
    Validation(FieldErrors),

    /// A well-formed course id that does not resolve to a course.
    #[error("course not found: {0}")]
    CourseNotFound(CourseId),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

fn describe(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, reason)| format!("{field}: {reason}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl CatalogError {
    /// A validation error for a single field.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), reason.into());
        Self::Validation(fields)
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::CourseNotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }
}

/// Accumulates field errors so every bad field is reported at once.
#[derive(Debug, Default)]
pub(crate) struct Checker {
    fields: FieldErrors,
}

impl Checker {
    pub(crate) fn reject(&mut self, field: &str, reason: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| reason.into());
    }

    /// Record the error of `result` under `field`, returning its value.
    pub(crate) fn check<T>(
        &mut self,
        field: &str,
        result: std::result::Result<T, String>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(reason) => {
                self.reject(field, reason);
                None
            }
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(self.fields))
        }
    }
}
