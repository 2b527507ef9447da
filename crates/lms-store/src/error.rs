//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// The database could not be reached.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// A document could not be converted to or from its record type.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the failure came from losing the connection rather than from
    /// the request itself.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_classified() {
        assert!(StoreError::Unavailable("no server".into()).is_unavailable());
        assert!(!StoreError::Database("bad pipeline".into()).is_unavailable());
        assert!(!StoreError::NotFound.is_unavailable());
    }

    #[test]
    fn messages_carry_cause() {
        let err = StoreError::Database("code 2".into());
        assert_eq!(err.to_string(), "database error: code 2");
    }
}
