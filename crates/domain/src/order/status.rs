//! Order and item status machines.

use serde::{Deserialize, Serialize};

/// Production lifecycle of a single item.
///
/// ```text
/// Queued ──► Ready
///    └─────► FailedSubmission   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductionStatus {
    /// Waiting for the production machine to finish the item.
    #[default]
    Queued,

    /// The machine reported the item finished; inventory deducted and a
    /// slot bound.
    Ready,

    /// Handoff to the production queue failed (terminal).
    FailedSubmission,
}

impl ProductionStatus {
    /// Returns true if the item can still be edited or removed.
    pub fn is_editable(&self) -> bool {
        matches!(self, ProductionStatus::Queued)
    }

    /// Returns true if no further production transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProductionStatus::Ready | ProductionStatus::FailedSubmission
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Queued => "QUEUED",
            ProductionStatus::Ready => "READY",
            ProductionStatus::FailedSubmission => "FAILED_SUBMISSION",
        }
    }
}

impl std::fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of an order in its lifecycle.
///
/// ```text
/// Pending ──► Completed ──► Delivered
///    │             ▲
///    ├──► PartiallyFailed (items failed submission, rest produced)
///    └──► Cancelled (only while nothing was produced)
/// ```
///
/// `Pending`, `Completed` and `PartiallyFailed` are derived from the item
/// statuses; `Delivered` and `Cancelled` are explicit operator/customer
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// At least one item is still queued for production.
    #[default]
    Pending,

    /// Every item has been produced.
    Completed,

    /// Submission settled with at least one failed item.
    PartiallyFailed,

    /// Delivery confirmed and the expedition slot released (terminal).
    Delivered,

    /// Cancelled before any production happened (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Derives the order status from the item production statuses.
    ///
    /// `Completed` iff every item is `Ready`; `Pending` while any item is
    /// still `Queued`; `PartiallyFailed` once submission settled with at
    /// least one failure.
    pub fn derive(items: &[ProductionStatus]) -> OrderStatus {
        if items.iter().any(|s| *s == ProductionStatus::Queued) {
            OrderStatus::Pending
        } else if items.iter().all(|s| *s == ProductionStatus::Ready) {
            OrderStatus::Completed
        } else {
            OrderStatus::PartiallyFailed
        }
    }

    /// Returns true if items can be edited or removed in this state.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be cancelled from this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be sent to the production queue.
    pub fn can_submit(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if delivery can be confirmed from this state.
    pub fn can_confirm_delivery(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::PartiallyFailed => "PARTIALLY_FAILED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
