//! Records owned by the store: inventory ledger entries, expedition slots
//! and customers.

use chrono::{DateTime, Utc};
use common::{CustomerId, InventoryItemId, OrderId, SlotId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};

/// One stock line of the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    /// Short stable code the fulfillment flow deducts by (e.g. `B1`, `M2`).
    pub code: String,
    pub name: String,
    /// Display grouping (blocks, materials, soles, colors, laces).
    pub category: String,
    /// May go negative unless strict mode is enabled.
    pub quantity_on_hand: i64,
    /// Alerting threshold only; never blocks a sale.
    pub minimum_threshold: i64,
}

impl InventoryItem {
    /// Returns true if the stock fell to or under its alert threshold.
    pub fn is_low(&self) -> bool {
        self.quantity_on_hand <= self.minimum_threshold
    }
}

/// Whether a slot is free or bound to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Free,
    Occupied,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Free => "FREE",
            SlotStatus::Occupied => "OCCUPIED",
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A physical pickup/delivery slot, bound to at most one order at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionSlot {
    pub id: SlotId,
    /// Label painted on the physical slot (e.g. `S1`).
    pub label: String,
    pub status: SlotStatus,
    pub order_ref: Option<OrderId>,
    pub occupied_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
}

/// A storefront customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    /// Salted argon2 hash; the plaintext never leaves request scope.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer account with an already-hashed password.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: CustomerId::new(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Outcome of recording a finished-production callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub order_id: OrderId,
    pub item_id: common::OrderItemId,
    pub slot_label: String,
    pub order_status: OrderStatus,
    /// False when the callback was a duplicate and nothing changed.
    pub deducted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock_detection() {
        let mut item = InventoryItem {
            id: InventoryItemId::new(),
            code: "B1".to_string(),
            name: "Bloco casual".to_string(),
            category: "blocks".to_string(),
            quantity_on_hand: 10,
            minimum_threshold: 5,
        };
        assert!(!item.is_low());

        item.quantity_on_hand = 5;
        assert!(item.is_low());

        item.quantity_on_hand = -2;
        assert!(item.is_low());
    }

    #[test]
    fn test_slot_status_display() {
        assert_eq!(SlotStatus::Free.to_string(), "FREE");
        assert_eq!(SlotStatus::Occupied.to_string(), "OCCUPIED");
    }

    #[test]
    fn test_customer_serialization_omits_password_hash() {
        let customer = Customer {
            id: CustomerId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&customer).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
