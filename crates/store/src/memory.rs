//! In-memory store implementation for tests and local development.
//!
//! Provides the same interface as the PostgreSQL implementation. All
//! state lives behind one `RwLock`, so every composite operation is
//! naturally atomic: the write lock is held across pick-and-bind for
//! slots and across the whole production callback sequence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CorrelationId, CustomerId, InventoryItemId, OrderId, SlotId};
use domain::{mapper, Order, ProductionStatus};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::model::{Customer, ExpeditionSlot, InventoryItem, ProductionRecord, SlotStatus};
use crate::store::Store;

#[derive(Default)]
struct MemoryState {
    orders: HashMap<OrderId, Order>,
    inventory: Vec<InventoryItem>,
    slots: Vec<ExpeditionSlot>,
    customers: HashMap<CustomerId, Customer>,
}

/// In-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a ledger entry.
    pub async fn seed_inventory(
        &self,
        code: &str,
        name: &str,
        category: &str,
        quantity: i64,
        threshold: i64,
    ) {
        self.state.write().await.inventory.push(InventoryItem {
            id: InventoryItemId::new(),
            code: code.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            quantity_on_hand: quantity,
            minimum_threshold: threshold,
        });
    }

    /// Seeds free expedition slots with the given labels.
    pub async fn seed_slots(&self, labels: &[&str]) {
        let mut state = self.state.write().await;
        for label in labels {
            state.slots.push(ExpeditionSlot {
                id: SlotId::new(),
                label: label.to_string(),
                status: SlotStatus::Free,
                order_ref: None,
                occupied_at: None,
                released_at: None,
            });
        }
    }

    /// Returns the quantity on hand for a code, for assertions in tests.
    pub async fn quantity_on_hand(&self, code: &str) -> Option<i64> {
        self.state
            .read()
            .await
            .inventory
            .iter()
            .find(|i| i.code == code)
            .map(|i| i.quantity_on_hand)
    }
}

fn deduct_in(state: &mut MemoryState, code: &str, quantity: u32, strict: bool) -> Result<()> {
    match state.inventory.iter_mut().find(|i| i.code == code) {
        Some(item) => {
            if strict && item.quantity_on_hand < i64::from(quantity) {
                return Err(StoreError::InsufficientStock {
                    code: code.to_string(),
                    on_hand: item.quantity_on_hand,
                    requested: quantity,
                });
            }
            item.quantity_on_hand -= i64::from(quantity);
            Ok(())
        }
        None => {
            tracing::warn!(code, "deduct for unknown inventory code ignored");
            Ok(())
        }
    }
}

fn bind_slot_in(
    state: &mut MemoryState,
    slot_label: Option<&str>,
    order_id: OrderId,
) -> Result<ExpeditionSlot> {
    let slot = match slot_label {
        Some(label) => {
            let slot = state
                .slots
                .iter_mut()
                .find(|s| s.label == label)
                .ok_or_else(|| StoreError::SlotNotFound(label.to_string()))?;
            if slot.status == SlotStatus::Occupied {
                return Err(StoreError::SlotOccupied(label.to_string()));
            }
            slot
        }
        None => state
            .slots
            .iter_mut()
            .find(|s| s.status == SlotStatus::Free)
            .ok_or(StoreError::NoFreeSlot)?,
    };

    slot.status = SlotStatus::Occupied;
    slot.order_ref = Some(order_id);
    slot.occupied_at = Some(Utc::now());
    Ok(slot.clone())
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.orders.contains_key(&order.id) {
            return Err(StoreError::OrderNotFound(order.id));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .orders
            .remove(&order_id)
            .map(|_| ())
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn find_order_by_tracking(&self, tracking: &CorrelationId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| {
                o.items
                    .iter()
                    .any(|i| i.tracking_code.as_ref() == Some(tracking))
            })
            .cloned())
    }

    async fn record_production_finished(
        &self,
        tracking: &CorrelationId,
        slot_label: Option<&str>,
        strict: bool,
    ) -> Result<ProductionRecord> {
        let mut state = self.state.write().await;

        let order_id = state
            .orders
            .values()
            .find(|o| {
                o.items
                    .iter()
                    .any(|i| i.tracking_code.as_ref() == Some(tracking))
            })
            .map(|o| o.id)
            .ok_or_else(|| StoreError::TrackingCodeNotFound(tracking.clone()))?;

        let mut order = state.orders.get(&order_id).cloned().unwrap();
        let item = order
            .items
            .iter_mut()
            .find(|i| i.tracking_code.as_ref() == Some(tracking))
            .unwrap();
        let item_id = item.id;

        // Terminal orders accept no further production events.
        if order.status.is_terminal() {
            return Err(StoreError::Domain(domain::OrderError::OrderClosed {
                order_id,
                status: order.status,
            }));
        }

        // Duplicate callback: acknowledge without touching anything.
        if item.production_status == ProductionStatus::Ready {
            let label = item
                .expedition_slot
                .and_then(|slot_id| {
                    state
                        .slots
                        .iter()
                        .find(|s| s.id == slot_id)
                        .map(|s| s.label.clone())
                })
                .unwrap_or_default();
            return Ok(ProductionRecord {
                order_id,
                item_id,
                slot_label: label,
                order_status: order.status,
                deducted: false,
            });
        }

        // A failed submission never reaches the factory; reject before touching stock.
        if item.production_status == ProductionStatus::FailedSubmission {
            return Err(StoreError::Domain(
                domain::OrderError::ItemSubmissionFailed { item_id },
            ));
        }

        let deductions = mapper::to_inventory_deductions(&item.config);

        // Verify strict availability up front so a rejection applies nothing.
        if strict {
            for d in &deductions {
                if let Some(entry) = state.inventory.iter().find(|i| i.code == d.code) {
                    if entry.quantity_on_hand < i64::from(d.quantity) {
                        return Err(StoreError::InsufficientStock {
                            code: d.code.clone(),
                            on_hand: entry.quantity_on_hand,
                            requested: d.quantity,
                        });
                    }
                }
            }
        }

        // Bind the slot before deducting: the strict pre-check above means
        // no step after a successful bind can fail, so a slot rejection
        // leaves the ledger untouched and the callback retryable.
        let slot = bind_slot_in(&mut state, slot_label, order_id)?;

        for d in &deductions {
            deduct_in(&mut state, &d.code, d.quantity, strict)?;
        }

        let item = order.items.iter_mut().find(|i| i.id == item_id).unwrap();
        item.mark_ready(slot.id)?;
        order.recompute_status();
        let order_status = order.status;
        state.orders.insert(order_id, order);

        Ok(ProductionRecord {
            order_id,
            item_id,
            slot_label: slot.label,
            order_status,
            deducted: true,
        })
    }

    async fn record_delivery(&self, order_id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;

        let mut order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.confirm_delivery()?;

        for slot in state
            .slots
            .iter_mut()
            .filter(|s| s.order_ref == Some(order_id))
        {
            slot.status = SlotStatus::Free;
            slot.order_ref = None;
            slot.released_at = Some(Utc::now());
        }

        state.orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn deduct(&self, code: &str, quantity: u32, strict: bool) -> Result<()> {
        let mut state = self.state.write().await;
        deduct_in(&mut state, code, quantity, strict)
    }

    async fn restock(&self, code: &str, quantity: u32) -> Result<()> {
        let mut state = self.state.write().await;
        match state.inventory.iter_mut().find(|i| i.code == code) {
            Some(item) => {
                item.quantity_on_hand += i64::from(quantity);
                Ok(())
            }
            None => {
                tracing::warn!(code, "restock for unknown inventory code ignored");
                Ok(())
            }
        }
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryItem>> {
        let state = self.state.read().await;
        let mut items = state.inventory.clone();
        items.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn manual_restock(
        &self,
        item_id: InventoryItemId,
        quantity: u32,
    ) -> Result<InventoryItem> {
        let mut state = self.state.write().await;
        let item = state
            .inventory
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(StoreError::InventoryItemNotFound(item_id))?;
        item.quantity_on_hand += i64::from(quantity);
        Ok(item.clone())
    }

    async fn allocate_slot(&self, order_id: OrderId) -> Result<ExpeditionSlot> {
        let mut state = self.state.write().await;
        bind_slot_in(&mut state, None, order_id)
    }

    async fn occupy_slot(&self, label: &str, order_id: OrderId) -> Result<ExpeditionSlot> {
        let mut state = self.state.write().await;
        bind_slot_in(&mut state, Some(label), order_id)
    }

    async fn release_slot(&self, order_id: OrderId) -> Result<ExpeditionSlot> {
        let mut state = self.state.write().await;
        let slot = state
            .slots
            .iter_mut()
            .find(|s| s.status == SlotStatus::Occupied && s.order_ref == Some(order_id))
            .ok_or(StoreError::SlotNotBound(order_id))?;
        slot.status = SlotStatus::Free;
        slot.order_ref = None;
        slot.released_at = Some(Utc::now());
        Ok(slot.clone())
    }

    async fn count_free_slots(&self) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .slots
            .iter()
            .filter(|s| s.status == SlotStatus::Free)
            .count() as i64)
    }

    async fn list_slots(&self) -> Result<Vec<ExpeditionSlot>> {
        let state = self.state.read().await;
        let mut slots = state.slots.clone();
        slots.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(slots)
    }

    async fn create_customer(&self, customer: &Customer) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .customers
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&customer.email))
        {
            return Err(StoreError::DuplicateEmail(customer.email.clone()));
        }
        state.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&customer_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::catalog::{Color, LaceDetail, Material, SneakerConfig, Sole, Style};

    fn config() -> SneakerConfig {
        SneakerConfig {
            style: Style::Casual,
            material: Material::Couro,
            sole: Sole::Borracha,
            color: Color::Branco,
            lace_detail: LaceDetail::CadarcoNormal,
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (code, name, category) in [
            ("B1", "Bloco casual", "blocks"),
            ("M1", "Couro", "materials"),
            ("S1", "Sola borracha", "soles"),
            ("L1", "Tinta branca", "colors"),
            ("D1", "Cadarço normal", "laces"),
        ] {
            store.seed_inventory(code, name, category, 10, 2).await;
        }
        store.seed_slots(&["EXP-01", "EXP-02"]).await;
        store
    }

    async fn queued_order(store: &MemoryStore, tracking: &str) -> Order {
        let mut order = Order::new(CustomerId::new(), vec![config()]).unwrap();
        order.items[0].tracking_code = Some(CorrelationId::new(tracking));
        store.create_order(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_deduct_and_restock_symmetry() {
        let store = seeded_store().await;

        store.deduct("M1", 3, false).await.unwrap();
        assert_eq!(store.quantity_on_hand("M1").await, Some(7));

        store.restock("M1", 3).await.unwrap();
        assert_eq!(store.quantity_on_hand("M1").await, Some(10));
    }

    #[tokio::test]
    async fn test_deduct_unknown_code_is_noop() {
        let store = seeded_store().await;
        store.deduct("ZZ", 5, false).await.unwrap();
        store.restock("ZZ", 5).await.unwrap();
    }

    #[tokio::test]
    async fn test_deduct_may_go_negative_without_strict() {
        let store = seeded_store().await;
        store.deduct("L1", 15, false).await.unwrap();
        assert_eq!(store.quantity_on_hand("L1").await, Some(-5));
    }

    #[tokio::test]
    async fn test_strict_deduct_rejects_insufficient_stock() {
        let store = seeded_store().await;
        let result = store.deduct("L1", 15, true).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { .. })
        ));
        assert_eq!(store.quantity_on_hand("L1").await, Some(10));
    }

    #[tokio::test]
    async fn test_manual_restock_by_id() {
        let store = seeded_store().await;
        let items = store.list_inventory().await.unwrap();
        let target = items.iter().find(|i| i.code == "D1").unwrap();

        let updated = store.manual_restock(target.id, 4).await.unwrap();
        assert_eq!(updated.quantity_on_hand, 14);

        let missing = store.manual_restock(InventoryItemId::new(), 1).await;
        assert!(matches!(
            missing,
            Err(StoreError::InventoryItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_inventory_ordered_by_category_then_name() {
        let store = seeded_store().await;
        let items = store.list_inventory().await.unwrap();
        let keys: Vec<(String, String)> = items
            .iter()
            .map(|i| (i.category.clone(), i.name.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[tokio::test]
    async fn test_slot_allocate_release_cycle() {
        let store = seeded_store().await;
        let order_id = OrderId::new();

        assert_eq!(store.count_free_slots().await.unwrap(), 2);

        let slot = store.allocate_slot(order_id).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Occupied);
        assert_eq!(slot.order_ref, Some(order_id));
        assert!(slot.occupied_at.is_some());
        assert_eq!(store.count_free_slots().await.unwrap(), 1);

        let released = store.release_slot(order_id).await.unwrap();
        assert_eq!(released.status, SlotStatus::Free);
        assert_eq!(released.order_ref, None);
        assert!(released.released_at.is_some());
        assert_eq!(store.count_free_slots().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_release_unbound_order_fails() {
        let store = seeded_store().await;
        let result = store.release_slot(OrderId::new()).await;
        assert!(matches!(result, Err(StoreError::SlotNotBound(_))));
    }

    #[tokio::test]
    async fn test_occupy_specific_label() {
        let store = seeded_store().await;
        let order_id = OrderId::new();

        let slot = store.occupy_slot("EXP-02", order_id).await.unwrap();
        assert_eq!(slot.label, "EXP-02");

        let taken = store.occupy_slot("EXP-02", OrderId::new()).await;
        assert!(matches!(taken, Err(StoreError::SlotOccupied(_))));

        let unknown = store.occupy_slot("EXP-99", OrderId::new()).await;
        assert!(matches!(unknown, Err(StoreError::SlotNotFound(_))));
    }

    #[tokio::test]
    async fn test_slot_exclusivity_under_concurrent_allocation() {
        let store = seeded_store().await; // 2 free slots
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.allocate_slot(OrderId::new()).await
            }));
        }

        let mut won = Vec::new();
        for handle in handles {
            if let Ok(slot) = handle.await.unwrap() {
                won.push(slot.id);
            }
        }

        // Exactly as many winners as there were free slots, all distinct.
        assert_eq!(won.len(), 2);
        won.sort_by_key(|id| id.as_uuid());
        won.dedup();
        assert_eq!(won.len(), 2);
    }

    #[tokio::test]
    async fn test_production_finished_deducts_binds_and_completes() {
        let store = seeded_store().await;
        let order = queued_order(&store, "PRD-1").await;

        let record = store
            .record_production_finished(&CorrelationId::new("PRD-1"), Some("EXP-01"), false)
            .await
            .unwrap();

        assert!(record.deducted);
        assert_eq!(record.slot_label, "EXP-01");
        assert_eq!(record.order_status, domain::OrderStatus::Completed);

        for code in ["B1", "M1", "S1", "L1", "D1"] {
            assert_eq!(store.quantity_on_hand(code).await, Some(9), "code {code}");
        }

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(
            stored.items[0].production_status,
            ProductionStatus::Ready
        );
        assert!(stored.items[0].expedition_slot.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_callback_deducts_once() {
        let store = seeded_store().await;
        queued_order(&store, "PRD-2").await;
        let tracking = CorrelationId::new("PRD-2");

        let first = store
            .record_production_finished(&tracking, Some("EXP-01"), false)
            .await
            .unwrap();
        let second = store
            .record_production_finished(&tracking, Some("EXP-01"), false)
            .await
            .unwrap();

        assert!(first.deducted);
        assert!(!second.deducted);
        assert_eq!(second.order_status, first.order_status);
        assert_eq!(store.quantity_on_hand("M1").await, Some(9));
        assert_eq!(store.count_free_slots().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_callback_unknown_tracking_code() {
        let store = seeded_store().await;
        let result = store
            .record_production_finished(&CorrelationId::new("PRD-404"), None, false)
            .await;
        assert!(matches!(result, Err(StoreError::TrackingCodeNotFound(_))));
    }

    #[tokio::test]
    async fn test_strict_callback_applies_nothing_on_rejection() {
        let store = seeded_store().await;
        queued_order(&store, "PRD-3").await;
        store.deduct("D1", 10, false).await.unwrap(); // drain laces to zero

        let result = store
            .record_production_finished(&CorrelationId::new("PRD-3"), Some("EXP-01"), true)
            .await;
        assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));

        // Nothing else was deducted and the slot stayed free.
        assert_eq!(store.quantity_on_hand("B1").await, Some(10));
        assert_eq!(store.count_free_slots().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_callback_occupied_slot_applies_nothing() {
        let store = seeded_store().await;
        queued_order(&store, "PRD-7").await;
        store.occupy_slot("EXP-01", OrderId::new()).await.unwrap();

        // Repeated callbacks against the taken slot must not drain the ledger.
        for _ in 0..2 {
            let result = store
                .record_production_finished(&CorrelationId::new("PRD-7"), Some("EXP-01"), false)
                .await;
            assert!(matches!(result, Err(StoreError::SlotOccupied(_))));
            assert_eq!(store.quantity_on_hand("B1").await, Some(10));
        }

        let order = store
            .find_order_by_tracking(&CorrelationId::new("PRD-7"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.items[0].production_status, ProductionStatus::Queued);

        // The free slot remains usable once the callback names it.
        store
            .record_production_finished(&CorrelationId::new("PRD-7"), Some("EXP-02"), false)
            .await
            .unwrap();
        assert_eq!(store.quantity_on_hand("B1").await, Some(9));
    }

    #[tokio::test]
    async fn test_callback_with_pool_exhausted_applies_nothing() {
        let store = seeded_store().await;
        queued_order(&store, "PRD-8").await;
        store.occupy_slot("EXP-01", OrderId::new()).await.unwrap();
        store.occupy_slot("EXP-02", OrderId::new()).await.unwrap();

        let result = store
            .record_production_finished(&CorrelationId::new("PRD-8"), None, false)
            .await;
        assert!(matches!(result, Err(StoreError::NoFreeSlot)));
        assert_eq!(store.quantity_on_hand("B1").await, Some(10));
    }

    #[tokio::test]
    async fn test_callback_on_cancelled_order_refused() {
        let store = seeded_store().await;
        let mut order = queued_order(&store, "PRD-9").await;
        order.cancel().unwrap();
        store.save_order(&order).await.unwrap();

        let result = store
            .record_production_finished(&CorrelationId::new("PRD-9"), Some("EXP-01"), false)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Domain(
                domain::OrderError::OrderClosed { .. }
            ))
        ));
        assert_eq!(store.quantity_on_hand("B1").await, Some(10));
        assert_eq!(store.count_free_slots().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_record_delivery_releases_every_slot() {
        let store = seeded_store().await;
        let order = queued_order(&store, "PRD-10").await;
        store
            .record_production_finished(&CorrelationId::new("PRD-10"), Some("EXP-01"), false)
            .await
            .unwrap();

        let delivered = store.record_delivery(order.id).await.unwrap();
        assert_eq!(delivered.status, domain::OrderStatus::Delivered);

        let slots = store.list_slots().await.unwrap();
        let s1 = slots.iter().find(|s| s.label == "EXP-01").unwrap();
        assert_eq!(s1.status, SlotStatus::Free);
        assert!(s1.order_ref.is_none());
        assert!(s1.released_at.is_some());
    }

    #[tokio::test]
    async fn test_record_delivery_requires_completed() {
        let store = seeded_store().await;
        let order = queued_order(&store, "PRD-11").await;
        store.occupy_slot("EXP-01", order.id).await.unwrap();

        let result = store.record_delivery(order.id).await;
        assert!(matches!(
            result,
            Err(StoreError::Domain(
                domain::OrderError::NotCompleted { .. }
            ))
        ));
        // The bound slot is untouched on rejection.
        assert_eq!(store.count_free_slots().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let customer = Customer {
            id: CustomerId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        store.create_customer(&customer).await.unwrap();

        let dup = Customer {
            id: CustomerId::new(),
            email: "ANA@example.com".to_string(),
            ..customer.clone()
        };
        let result = store.create_customer(&dup).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_delete_order_when_last_item_removed() {
        let store = seeded_store().await;
        let order = queued_order(&store, "PRD-4").await;

        store.delete_order(order.id).await.unwrap();
        assert!(store.get_order(order.id).await.unwrap().is_none());

        let again = store.delete_order(order.id).await;
        assert!(matches!(again, Err(StoreError::OrderNotFound(_))));
    }
}
