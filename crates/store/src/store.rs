//! The `Store` trait: every persistence operation the fulfillment flow
//! needs, behind one async interface with PostgreSQL and in-memory
//! implementations.
//!
//! Mutations to the two genuinely shared resources (inventory ledger,
//! expedition slot pool) are atomic conditional writes in both backends,
//! and the multi-statement sequences (order creation, production
//! callback) run inside a single transaction.

use async_trait::async_trait;
use common::{CorrelationId, CustomerId, InventoryItemId, OrderId};
use domain::Order;

use crate::error::Result;
use crate::model::{Customer, ExpeditionSlot, InventoryItem, ProductionRecord};

/// Persistence operations for orders, inventory, slots and customers.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Orders --

    /// Persists a new order together with its items, atomically.
    async fn create_order(&self, order: &Order) -> Result<()>;

    /// Loads an order with its items.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a customer's orders, newest first.
    async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Overwrites an order and its items, atomically.
    ///
    /// Items present in the stored order but absent from `order` are
    /// deleted; the rest are upserted.
    async fn save_order(&self, order: &Order) -> Result<()>;

    /// Deletes an order and its items. Used when the last item is removed.
    async fn delete_order(&self, order_id: OrderId) -> Result<()>;

    /// Finds the order owning the item with the given tracking code.
    async fn find_order_by_tracking(&self, tracking: &CorrelationId) -> Result<Option<Order>>;

    /// Records a finished-production callback in one atomic unit:
    /// deduct the item's inventory set, bind the expedition slot, mark the
    /// item ready and re-derive the order status.
    ///
    /// Idempotent: if the item is already ready the call changes nothing
    /// and the returned record has `deducted == false`.
    ///
    /// `slot_label` is the slot reported by the production machine; when
    /// absent, an arbitrary free slot is allocated instead. With `strict`
    /// set, deductions that would go negative are rejected and nothing is
    /// applied.
    async fn record_production_finished(
        &self,
        tracking: &CorrelationId,
        slot_label: Option<&str>,
        strict: bool,
    ) -> Result<ProductionRecord>;

    /// Records a confirmed delivery in one atomic unit: every slot bound
    /// to the order is released and the order becomes `Delivered`.
    ///
    /// Fails without touching anything unless the order is `Completed`.
    async fn record_delivery(&self, order_id: OrderId) -> Result<Order>;

    // -- Inventory ledger --

    /// Decrements stock for a code with a single conditional update.
    ///
    /// Unknown codes are a logged no-op. Without `strict` the quantity may
    /// go negative; with it, insufficient stock is an error.
    async fn deduct(&self, code: &str, quantity: u32, strict: bool) -> Result<()>;

    /// Increments stock for a code. Unknown codes are a logged no-op.
    async fn restock(&self, code: &str, quantity: u32) -> Result<()>;

    /// Returns all ledger entries ordered by category then name.
    async fn list_inventory(&self) -> Result<Vec<InventoryItem>>;

    /// Operator-driven increment by ledger id.
    async fn manual_restock(&self, item_id: InventoryItemId, quantity: u32) -> Result<InventoryItem>;

    // -- Expedition slot pool --

    /// Binds an arbitrary free slot to the order, atomically.
    async fn allocate_slot(&self, order_id: OrderId) -> Result<ExpeditionSlot>;

    /// Binds the slot with the given label to the order, atomically.
    async fn occupy_slot(&self, label: &str, order_id: OrderId) -> Result<ExpeditionSlot>;

    /// Releases the slot bound to the order.
    async fn release_slot(&self, order_id: OrderId) -> Result<ExpeditionSlot>;

    /// Counts free slots for capacity display.
    async fn count_free_slots(&self) -> Result<i64>;

    /// Returns all slots ordered by label.
    async fn list_slots(&self) -> Result<Vec<ExpeditionSlot>>;

    // -- Customers --

    /// Persists a new customer; duplicate emails are a conflict.
    async fn create_customer(&self, customer: &Customer) -> Result<()>;

    /// Loads a customer by id.
    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>>;
}
