//! Whole-collection dumps under `/api/all`.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;

use lms_catalog::Catalog;

use crate::dto::{convert, EnrollmentResponse, OrderResponse, ProgressResponse};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Every enrollment.
pub async fn enrollments<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.all_enrollments().await?;
    Ok(Envelope::new(
        convert::<_, EnrollmentResponse>(rows),
        "Enrollments fetched successfully",
    ))
}

/// Every progress entry.
pub async fn progress<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.all_progress().await?;
    Ok(Envelope::new(
        convert::<_, ProgressResponse>(rows),
        "Progress fetched successfully",
    ))
}

/// Every order.
pub async fn orders<C: Catalog + 'static>(
    State(state): State<Arc<GatewayState<C>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.all_orders().await?;
    Ok(Envelope::new(
        convert::<_, OrderResponse>(rows),
        "Orders fetched successfully",
    ))
}
