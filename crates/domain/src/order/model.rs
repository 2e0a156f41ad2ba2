//! Order and item records.

use chrono::{DateTime, Utc};
use common::{CorrelationId, CustomerId, Money, OrderId, OrderItemId, SlotId};
use serde::{Deserialize, Serialize};

use crate::catalog::SneakerConfig;

use super::{OrderError, OrderStatus, ProductionStatus};

/// One customized sneaker within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub config: SneakerConfig,
    /// Sum of the five option surcharges, fixed at creation/edit time.
    pub price: Money,
    pub production_status: ProductionStatus,
    /// Correlation id handed back by the production queue on submission.
    pub tracking_code: Option<CorrelationId>,
    /// Physical slot bound when production finished.
    pub expedition_slot: Option<SlotId>,
    /// Filled in by the image generation collaborator; not owned here.
    pub image_url: Option<String>,
    /// Filled in by the message generation collaborator; not owned here.
    pub generated_message: Option<String>,
}

impl OrderItem {
    /// Creates a queued item for an order, priced from the catalog.
    pub fn new(order_id: OrderId, config: SneakerConfig) -> Self {
        Self {
            id: OrderItemId::new(),
            order_id,
            config,
            price: config.price(),
            production_status: ProductionStatus::Queued,
            tracking_code: None,
            expedition_slot: None,
            image_url: None,
            generated_message: None,
        }
    }

    /// Replaces the configuration and reprices the item.
    ///
    /// Only queued items may be edited.
    pub fn reconfigure(&mut self, config: SneakerConfig) -> Result<(), OrderError> {
        if !self.production_status.is_editable() {
            return Err(OrderError::ItemNotEditable {
                item_id: self.id,
                status: self.production_status,
            });
        }
        self.config = config;
        self.price = config.price();
        Ok(())
    }

    /// Marks the item produced, recording the bound slot.
    ///
    /// Idempotent: an item that is already `Ready` is left untouched and
    /// `false` is returned so callers skip the inventory deduction.
    pub fn mark_ready(&mut self, slot: SlotId) -> Result<bool, OrderError> {
        match self.production_status {
            ProductionStatus::Ready => Ok(false),
            ProductionStatus::Queued => {
                self.production_status = ProductionStatus::Ready;
                self.expedition_slot = Some(slot);
                Ok(true)
            }
            ProductionStatus::FailedSubmission => Err(OrderError::ItemSubmissionFailed {
                item_id: self.id,
            }),
        }
    }

    /// Records a failed handoff to the production queue (terminal).
    pub fn mark_submission_failed(&mut self) {
        if self.production_status == ProductionStatus::Queued {
            self.production_status = ProductionStatus::FailedSubmission;
        }
    }
}

/// A customer's order with its items.
///
/// The status is a pure function of the item statuses while the order is
/// in production; `Delivered` and `Cancelled` are explicit transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub total_value: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Creates a pending order with one queued item per configuration.
    ///
    /// An order cannot exist without items.
    pub fn new(customer_id: CustomerId, configs: Vec<SneakerConfig>) -> Result<Self, OrderError> {
        if configs.is_empty() {
            return Err(OrderError::NoItems);
        }

        let id = OrderId::new();
        let items: Vec<OrderItem> = configs
            .into_iter()
            .map(|config| OrderItem::new(id, config))
            .collect();

        let mut order = Self {
            id,
            customer_id,
            status: OrderStatus::Pending,
            total_value: Money::zero(),
            created_at: Utc::now(),
            items,
        };
        order.recompute_total();
        Ok(order)
    }

    /// Returns an item by id.
    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Returns a mutable item by id.
    pub fn item_mut(&mut self, item_id: OrderItemId) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Recomputes the total from the item prices.
    pub fn recompute_total(&mut self) {
        self.total_value = self.items.iter().map(|i| i.price).sum();
    }

    /// Re-derives the order status from the item statuses.
    ///
    /// Terminal states are never overwritten; items cannot transition
    /// once the order is delivered or cancelled.
    pub fn recompute_status(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        let statuses: Vec<ProductionStatus> =
            self.items.iter().map(|i| i.production_status).collect();
        self.status = OrderStatus::derive(&statuses);
    }

    /// Replaces an item's configuration and updates the total.
    pub fn edit_item(
        &mut self,
        item_id: OrderItemId,
        config: SneakerConfig,
    ) -> Result<(), OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::OrderNotEditable {
                order_id: self.id,
                status: self.status,
            });
        }
        let item = self
            .item_mut(item_id)
            .ok_or(OrderError::ItemNotFound { item_id })?;
        item.reconfigure(config)?;
        self.recompute_total();
        Ok(())
    }

    /// Removes an item and updates the total.
    ///
    /// Returns `true` when the last item was removed; the caller must then
    /// delete the whole order, since an order without items must not exist.
    pub fn remove_item(&mut self, item_id: OrderItemId) -> Result<bool, OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::OrderNotEditable {
                order_id: self.id,
                status: self.status,
            });
        }
        let item = self
            .item(item_id)
            .ok_or(OrderError::ItemNotFound { item_id })?;
        if !item.production_status.is_editable() {
            return Err(OrderError::ItemNotEditable {
                item_id,
                status: item.production_status,
            });
        }

        self.items.retain(|i| i.id != item_id);
        self.recompute_total();
        Ok(self.items.is_empty())
    }

    /// Confirms delivery of a completed order.
    pub fn confirm_delivery(&mut self) -> Result<(), OrderError> {
        if !self.status.can_confirm_delivery() {
            return Err(OrderError::NotCompleted {
                order_id: self.id,
                status: self.status,
            });
        }
        self.status = OrderStatus::Delivered;
        Ok(())
    }

    /// Cancels the order.
    ///
    /// Allowed only while every item is still editable, i.e. nothing has
    /// been produced or failed submission.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.can_cancel()
            || self
                .items
                .iter()
                .any(|i| !i.production_status.is_editable())
        {
            return Err(OrderError::CannotCancel {
                order_id: self.id,
                status: self.status,
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Color, LaceDetail, Material, Sole, Style};

    fn config() -> SneakerConfig {
        SneakerConfig {
            style: Style::Casual,
            material: Material::Couro,
            sole: Sole::Borracha,
            color: Color::Branco,
            lace_detail: LaceDetail::CadarcoNormal,
        }
    }

    fn skate_config() -> SneakerConfig {
        SneakerConfig {
            style: Style::Skate,
            material: Material::Lona,
            sole: Sole::Tratorada,
            color: Color::Preto,
            lace_detail: LaceDetail::SemCadarco,
        }
    }

    fn order_with_items(n: usize) -> Order {
        Order::new(CustomerId::new(), vec![config(); n]).unwrap()
    }

    #[test]
    fn test_new_order_is_pending_with_queued_items() {
        let order = order_with_items(2);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order
            .items
            .iter()
            .all(|i| i.production_status == ProductionStatus::Queued));
        assert_eq!(order.total_value.cents(), 2 * 38_000);
    }

    #[test]
    fn test_order_without_items_is_rejected() {
        let result = Order::new(CustomerId::new(), vec![]);
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn test_edit_item_reprices_and_recomputes_total() {
        let mut order = order_with_items(2);
        let item_id = order.items[0].id;

        order.edit_item(item_id, skate_config()).unwrap();

        let expected = skate_config().price() + config().price();
        assert_eq!(order.total_value, expected);
        assert_eq!(
            order.total_value,
            order.items.iter().map(|i| i.price).sum()
        );
    }

    #[test]
    fn test_remove_item_recomputes_total() {
        let mut order = order_with_items(3);
        let item_id = order.items[1].id;

        let emptied = order.remove_item(item_id).unwrap();
        assert!(!emptied);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_value.cents(), 2 * 38_000);
    }

    #[test]
    fn test_removing_last_item_signals_order_deletion() {
        let mut order = order_with_items(1);
        let item_id = order.items[0].id;

        let emptied = order.remove_item(item_id).unwrap();
        assert!(emptied);
    }

    #[test]
    fn test_total_consistency_through_edit_sequence() {
        let mut order = order_with_items(2);
        let first = order.items[0].id;
        let second = order.items[1].id;

        order.edit_item(first, skate_config()).unwrap();
        order.remove_item(second).unwrap();
        order.edit_item(first, config()).unwrap();

        assert_eq!(
            order.total_value,
            order.items.iter().map(|i| i.price).sum()
        );
    }

    #[test]
    fn test_mark_ready_is_idempotent() {
        let mut order = order_with_items(1);
        let slot = SlotId::new();
        let item = &mut order.items[0];

        assert!(item.mark_ready(slot).unwrap());
        assert!(!item.mark_ready(slot).unwrap());
        assert_eq!(item.production_status, ProductionStatus::Ready);
        assert_eq!(item.expedition_slot, Some(slot));
    }

    #[test]
    fn test_status_derivation_after_each_transition() {
        let mut order = order_with_items(2);
        let slot = SlotId::new();

        order.items[0].mark_ready(slot).unwrap();
        order.recompute_status();
        assert_eq!(order.status, OrderStatus::Pending);

        order.items[1].mark_ready(SlotId::new()).unwrap();
        order.recompute_status();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_failed_submission_settles_as_partially_failed() {
        let mut order = order_with_items(2);

        order.items[0].mark_ready(SlotId::new()).unwrap();
        order.items[1].mark_submission_failed();
        order.recompute_status();

        assert_eq!(order.status, OrderStatus::PartiallyFailed);
    }

    #[test]
    fn test_cannot_edit_produced_item() {
        let mut order = order_with_items(2);
        let item_id = order.items[0].id;
        order.items[0].mark_ready(SlotId::new()).unwrap();

        let result = order.edit_item(item_id, skate_config());
        assert!(matches!(result, Err(OrderError::ItemNotEditable { .. })));
    }

    #[test]
    fn test_cannot_edit_after_completion() {
        let mut order = order_with_items(1);
        let item_id = order.items[0].id;
        order.items[0].mark_ready(SlotId::new()).unwrap();
        order.recompute_status();

        let result = order.edit_item(item_id, skate_config());
        assert!(matches!(result, Err(OrderError::OrderNotEditable { .. })));
    }

    #[test]
    fn test_confirm_delivery_requires_completed() {
        let mut order = order_with_items(1);
        assert!(matches!(
            order.confirm_delivery(),
            Err(OrderError::NotCompleted { .. })
        ));

        order.items[0].mark_ready(SlotId::new()).unwrap();
        order.recompute_status();
        order.confirm_delivery().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_cancel_only_before_production() {
        let mut order = order_with_items(2);
        order.items[0].mark_ready(SlotId::new()).unwrap();
        order.recompute_status();

        assert!(matches!(
            order.cancel(),
            Err(OrderError::CannotCancel { .. })
        ));

        let mut fresh = order_with_items(1);
        fresh.cancel().unwrap();
        assert_eq!(fresh.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_delivered_status_is_not_rederived() {
        let mut order = order_with_items(1);
        order.items[0].mark_ready(SlotId::new()).unwrap();
        order.recompute_status();
        order.confirm_delivery().unwrap();

        order.recompute_status();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = order_with_items(2);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
