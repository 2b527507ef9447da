//! HTTP gateway for the LMS course platform.
//!
//! This crate exposes the catalog over a JSON API. It handles:
//!
//! - Routing and request extraction (query strings, paths, JSON bodies)
//! - The `{data, message, meta?}` success envelope
//! - Mapping catalog errors to HTTP statuses and the error envelope
//! - Request tracing, CORS and body limits
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lms_catalog::CatalogService;
//! use lms_gateway::{create_router, GatewayConfig, GatewayState};
//! use lms_store::MongoStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MongoStore::connect("mongodb://localhost:27017", "lms").await?);
//! let catalog = Arc::new(CatalogService::new(store));
//!
//! let state = GatewayState::new(catalog, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dto;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ConfigError, GatewayConfig};
pub use envelope::{Envelope, Meta};
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
