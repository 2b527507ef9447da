//! Course catalog operations for the LMS course platform.
//!
//! This crate sits between the HTTP handlers and the storage layer. It owns
//! the input rules: loosely typed request fields are coerced and validated
//! here, in one step, before any query is built.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                Gateway (HTTP)                │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │                CatalogService                │
//! │  ┌────────────┐ ┌───────────┐ ┌───────────┐  │
//! │  │ validation │ │ listings  │ │ aggregates│  │
//! │  └────────────┘ └───────────┘ └───────────┘  │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!                ┌──────────────┐
//!                │    Store     │
//!                │  (MongoDB)   │
//!                └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use lms_catalog::{Catalog, CatalogService, FilterInput};
//! use lms_store::MongoStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MongoStore::connect("mongodb://localhost:27017", "lms").await?);
//! let catalog = CatalogService::new(store);
//!
//! let page = catalog.filter_and_paginate(&FilterInput::default()).await?;
//! println!("{} of {} courses", page.items.len(), page.total);
//! # Ok(())
//! # }
//! ```
//!
//! # Validation gate
//!
//! Operations that aggregate over one course first check that the id is well
//! formed (400 on failure) and then that the course exists (404), and only
//! then run the aggregation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod service;
pub mod types;

pub use error::{CatalogError, FieldErrors, Result};
pub use service::{Catalog, CatalogService, TOP_N};
pub use types::{
    ActivityDefaults, ActivityInput, CourseIdInput, CoursePreset, EnrollmentQuery, FacetPage,
    FilterInput, FilterRequest, NumberLike, Page, ProgressQuery, DEFAULT_LIMIT, MAX_LIMIT,
};

// Re-export commonly used types from dependencies for convenience
pub use lms_core::{CourseId, UserId};
pub use lms_store::{Course, CourseFacets, CourseSummary, CourseWithEnrollments};
