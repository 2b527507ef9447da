//! Fixed value sets used by course platform records.
//!
//! Client-supplied values must parse into one of these enums before they are
//! allowed anywhere near a query.

use std::fmt;
use std::str::FromStr;

use bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value that is not part of a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{value:?} is not one of {allowed:?}")]
pub struct VocabularyError {
    /// The rejected input.
    pub value: String,
    /// The accepted values.
    pub allowed: &'static [&'static str],
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The textual values accepted by [`FromStr`].
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            /// The stored textual form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = VocabularyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(VocabularyError {
                        value: s.to_string(),
                        allowed: Self::NAMES,
                    }),
                }
            }
        }

        impl From<$name> for Bson {
            fn from(value: $name) -> Self {
                Bson::String(value.as_str().to_string())
            }
        }
    };
}

vocabulary! {
    /// Difficulty level of a course.
    Level {
        /// Entry level.
        Beginner => "beginner",
        /// Some prior knowledge expected.
        Intermediate => "intermediate",
        /// Expert material.
        Advanced => "advanced",
    }
}

vocabulary! {
    /// Format of a lesson.
    LessonType {
        /// Recorded video.
        Video => "video",
        /// Reading material.
        Text => "text",
        /// Graded questions.
        Quiz => "quiz",
        /// Hand-in work.
        Assignment => "assignment",
        /// Scheduled live session.
        Live => "live",
    }
}

vocabulary! {
    /// State of an enrollment.
    EnrollmentStatus {
        /// The learner has access to the course.
        Active => "active",
        /// The enrollment was refunded.
        Refund => "refund",
    }
}

vocabulary! {
    /// State of a purchase.
    OrderStatus {
        /// Payment captured.
        Paid => "paid",
        /// Payment returned.
        Refunded => "refunded",
    }
}

vocabulary! {
    /// Completion state of a lesson for one learner.
    ProgressStatus {
        /// Lesson finished.
        Done => "done",
        /// Lesson started but not finished.
        Incomplete => "incomplete",
    }
}

impl Default for LessonType {
    fn default() -> Self {
        Self::Video
    }
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Paid
    }
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::Incomplete
    }
}
