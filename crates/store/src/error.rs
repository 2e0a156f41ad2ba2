//! Store error types.

use common::{CorrelationId, OrderId};
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Order not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No item carries the given production tracking code.
    #[error("no item with tracking code {0}")]
    TrackingCodeNotFound(CorrelationId),

    /// A customer with this email already exists.
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// Inventory item not found by id.
    #[error("inventory item not found: {0}")]
    InventoryItemNotFound(common::InventoryItemId),

    /// Strict mode rejected a deduction that would go negative.
    #[error("insufficient stock for {code}: {on_hand} on hand, {requested} requested")]
    InsufficientStock {
        code: String,
        on_hand: i64,
        requested: u32,
    },

    /// Every expedition slot is occupied.
    #[error("no free expedition slot")]
    NoFreeSlot,

    /// The named slot does not exist.
    #[error("unknown expedition slot: {0}")]
    SlotNotFound(String),

    /// The named slot is already bound to another order.
    #[error("expedition slot {0} is occupied")]
    SlotOccupied(String),

    /// No occupied slot is bound to the order.
    #[error("no expedition slot bound to order {0}")]
    SlotNotBound(OrderId),

    /// A domain rule rejected the mutation.
    #[error(transparent)]
    Domain(#[from] OrderError),

    /// Password hashing failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
