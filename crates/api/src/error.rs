//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Requesting customer does not own the resource.
    Forbidden(String),
    /// State conflict (duplicate email, invalid transition, no stock).
    Conflict(String),
    /// Fulfillment workflow error.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Internal(msg) => internal(msg),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::Catalog(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        FulfillmentError::CustomerNotFound(_) | FulfillmentError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        FulfillmentError::Domain(order_err) => order_error_to_response(order_err, &err),
        FulfillmentError::Store(store_err) => store_error_to_response(store_err, &err),
        FulfillmentError::ProductionQueue(_) | FulfillmentError::Provider(_) => {
            internal(err.to_string())
        }
    }
}

fn order_error_to_response(err: &OrderError, source: &FulfillmentError) -> (StatusCode, String) {
    match err {
        OrderError::NoItems => (StatusCode::BAD_REQUEST, source.to_string()),
        OrderError::ItemNotFound { .. } => (StatusCode::NOT_FOUND, source.to_string()),
        OrderError::OrderNotEditable { .. }
        | OrderError::ItemNotEditable { .. }
        | OrderError::ItemSubmissionFailed { .. }
        | OrderError::NotCompleted { .. }
        | OrderError::CannotCancel { .. }
        | OrderError::NotSubmittable { .. }
        | OrderError::OrderClosed { .. } => (StatusCode::CONFLICT, source.to_string()),
    }
}

fn store_error_to_response(err: &StoreError, source: &FulfillmentError) -> (StatusCode, String) {
    match err {
        StoreError::OrderNotFound(_)
        | StoreError::TrackingCodeNotFound(_)
        | StoreError::InventoryItemNotFound(_)
        | StoreError::SlotNotFound(_) => (StatusCode::NOT_FOUND, source.to_string()),
        StoreError::DuplicateEmail(_)
        | StoreError::InsufficientStock { .. }
        | StoreError::NoFreeSlot
        | StoreError::SlotOccupied(_)
        | StoreError::SlotNotBound(_) => (StatusCode::CONFLICT, source.to_string()),
        StoreError::Domain(order_err) => order_error_to_response(order_err, source),
        StoreError::Database(_) | StoreError::Serialization(_) | StoreError::Credential(_) => {
            internal(source.to_string())
        }
    }
}

// Logged in full, returned generically.
fn internal(detail: String) -> (StatusCode, String) {
    tracing::error!(error = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Fulfillment(FulfillmentError::Store(err))
    }
}
