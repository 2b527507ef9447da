//! Liveness endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use lms_catalog::Catalog;

use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Time the check ran.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: &'static str,
    /// `healthy` when the database answered a ping.
    pub database: &'static str,
}

/// Plain liveness message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Fixed message.
    pub message: &'static str,
}

/// Liveness probe that never touches the database.
pub async fn test() -> impl IntoResponse {
    Json(MessageResponse {
        message: "API is working",
    })
}

/// Health check handler.
///
/// Always answers 200; a failed ping only flips the `database` field.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "ok",
///   "timestamp": "2024-05-01T08:00:00Z",
///   "version": "0.1.0",
///   "database": "healthy"
/// }
/// ```
pub async fn health<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> impl IntoResponse {
    let database = match state.catalog.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            "unhealthy"
        }
    };

    let response = HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        database,
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_ok() {
        let response = test().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
