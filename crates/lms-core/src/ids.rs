//! Core identifier types for the course platform.
//!
//! Every record is keyed by a 12-byte database object id assigned on creation.
//! The wrappers here keep course, lesson and user references from being mixed
//! up while still serializing to a native object id inside BSON documents.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was empty or only whitespace.
    #[error("identifier is empty")]
    Empty,

    /// The identifier is not a 24-character hex object id.
    #[error("malformed identifier: {0:?}")]
    Malformed(String),
}

macro_rules! object_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(ObjectId);

        impl $name {
            /// Generate a fresh identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(ObjectId::new())
            }

            /// Wrap an existing object id.
            #[must_use]
            pub const fn from_object_id(oid: ObjectId) -> Self {
                Self(oid)
            }

            /// Parse an identifier from its 24-character hex form.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::Empty`] for blank input and
            /// [`IdError::Malformed`] when the input is not a valid object id.
            pub fn parse(s: &str) -> Result<Self, IdError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Empty);
                }
                ObjectId::parse_str(trimmed)
                    .map(Self)
                    .map_err(|_| IdError::Malformed(s.to_string()))
            }

            /// Return the underlying object id.
            #[must_use]
            pub const fn as_object_id(&self) -> &ObjectId {
                &self.0
            }

            /// Return the hex-encoded string representation.
            #[must_use]
            pub fn to_hex(&self) -> String {
                self.0.to_hex()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<ObjectId> for $name {
            fn from(oid: ObjectId) -> Self {
                Self(oid)
            }
        }

        impl From<$name> for ObjectId {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<$name> for Bson {
            fn from(id: $name) -> Self {
                Bson::ObjectId(id.0)
            }
        }

        // Byte order matches the database's own ordering of object ids.
        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.bytes().cmp(&other.0.bytes())
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
    };
}

object_id_type! {
    /// Identifier of a course record.
    CourseId
}

object_id_type! {
    /// Identifier of a lesson record.
    LessonId
}

object_id_type! {
    /// Identifier of a learner.
    ///
    /// Users live outside this system; the id is an opaque reference carried
    /// by enrollments, orders and progress records.
    UserId
}

object_id_type! {
    /// Identifier of a record with no dedicated id type (enrollments, orders,
    /// progress entries).
    RecordId
}
