//! Shared types for the sneaker storefront.

pub mod ids;
pub mod money;

pub use ids::{CorrelationId, CustomerId, InventoryItemId, OrderId, OrderItemId, SlotId};
pub use money::Money;
