//! Error types for the fulfillment workflow.

use common::{CustomerId, OrderId};
use domain::{CatalogError, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during fulfillment operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Domain rule violation.
    #[error(transparent)]
    Domain(#[from] OrderError),

    /// Invalid sneaker configuration.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The customer does not exist.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The production queue rejected or could not accept a submission.
    #[error("production queue error: {0}")]
    ProductionQueue(String),

    /// A content provider failed or returned an unusable response.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Result alias for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
