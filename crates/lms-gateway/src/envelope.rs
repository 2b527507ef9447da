//! The success envelope shared by every data route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Successful response body: `{"data", "message", "meta"?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Route payload.
    pub data: T,
    /// Human-readable summary.
    pub message: String,
    /// Paging information, on routes that report a total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Paging information.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Meta {
    /// Size of the whole filtered set.
    pub total: u64,
}

impl<T> Envelope<T> {
    /// Wrap a payload.
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            meta: None,
        }
    }

    /// Attach the filtered-set total.
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.meta = Some(Meta { total });
        self
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_is_omitted_without_total() {
        let json = serde_json::to_value(Envelope::new(vec![1, 2], "ok")).unwrap();
        assert_eq!(json, serde_json::json!({"data": [1, 2], "message": "ok"}));
    }

    #[test]
    fn meta_carries_total() {
        let json = serde_json::to_value(Envelope::new((), "ok").with_total(7)).unwrap();
        assert_eq!(json["meta"]["total"], 7);
    }
}
