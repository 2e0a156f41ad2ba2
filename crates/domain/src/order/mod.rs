//! Order aggregate and its state machines.

mod model;
mod status;

pub use model::{Order, OrderItem};
pub use status::{OrderStatus, ProductionStatus};

use common::{OrderId, OrderItemId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order must own at least one item.
    #[error("order has no items")]
    NoItems,

    /// The order is past the point where items can change.
    #[error("order {order_id} cannot be modified in {status} state")]
    OrderNotEditable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The item already entered production or failed submission.
    #[error("item {item_id} cannot be modified in {status} state")]
    ItemNotEditable {
        item_id: OrderItemId,
        status: ProductionStatus,
    },

    /// Item not found in the order.
    #[error("item not found: {item_id}")]
    ItemNotFound { item_id: OrderItemId },

    /// A finished callback arrived for an item whose submission failed.
    #[error("item {item_id} failed submission and cannot be produced")]
    ItemSubmissionFailed { item_id: OrderItemId },

    /// Delivery confirmation requires a completed order.
    #[error("order {order_id} is {status}, delivery requires COMPLETED")]
    NotCompleted {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Cancellation is only possible before any production.
    #[error("order {order_id} cannot be cancelled in {status} state")]
    CannotCancel {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Production submission requires a pending order.
    #[error("order {order_id} cannot be submitted in {status} state")]
    NotSubmittable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A terminal order accepts no further production events.
    #[error("order {order_id} is {status} and accepts no further production")]
    OrderClosed {
        order_id: OrderId,
        status: OrderStatus,
    },
}
