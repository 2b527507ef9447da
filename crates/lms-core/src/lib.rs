//! Core types and utilities for the LMS course platform.
//!
//! This crate provides the foundational types shared by the storage layer,
//! the catalog service and the HTTP gateway:
//!
//! - **Identifiers**: strongly-typed wrappers over database object ids for
//!   courses, lessons, users and generic records
//! - **Vocabularies**: the fixed enum value sets (course level, lesson type,
//!   enrollment/order/progress status) with strict parsing
//!
//! # Example
//!
//! ```
//! use lms_core::{CourseId, Level};
//!
//! let course_id = CourseId::parse("64f1a2b3c4d5e6f7a8b9c0d1").unwrap();
//! assert_eq!(course_id.to_hex(), "64f1a2b3c4d5e6f7a8b9c0d1");
//!
//! let level: Level = "beginner".parse().unwrap();
//! assert_eq!(level, Level::Beginner);
//! assert!("expert".parse::<Level>().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod vocab;

pub use ids::{CourseId, IdError, LessonId, RecordId, UserId};
pub use vocab::{EnrollmentStatus, Level, LessonType, OrderStatus, ProgressStatus, VocabularyError};
