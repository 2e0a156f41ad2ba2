//! PostgreSQL-backed store implementation.
//!
//! Slot binding and inventory deduction are expressed as single
//! conditional UPDATEs so concurrent requests cannot double-allocate a
//! slot or interleave a strict deduction past zero; order creation and
//! the production callback run inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CorrelationId, CustomerId, InventoryItemId, Money, OrderId, OrderItemId, SlotId};
use domain::{mapper, Order, OrderItem, OrderStatus, ProductionStatus, SneakerConfig};
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{Customer, ExpeditionSlot, InventoryItem, ProductionRecord, SlotStatus};
use crate::store::Store;

/// PostgreSQL store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status: parse_order_status(row.try_get("status")?)?,
            total_value: Money::from_cents(row.try_get("total_cents")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let config = SneakerConfig::from_raw(
            Some(row.try_get("style")?),
            Some(row.try_get("material")?),
            Some(row.try_get("sole")?),
            Some(row.try_get("color")?),
            Some(row.try_get("lace_detail")?),
        )
        .map_err(|e| StoreError::Serialization(serde_json::Error::io(std::io::Error::other(e))))?;

        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            config,
            price: Money::from_cents(row.try_get("price_cents")?),
            production_status: parse_production_status(row.try_get("production_status")?)?,
            tracking_code: row
                .try_get::<Option<String>, _>("tracking_code")?
                .map(CorrelationId::new),
            expedition_slot: row
                .try_get::<Option<Uuid>, _>("expedition_slot")?
                .map(SlotId::from_uuid),
            image_url: row.try_get("image_url")?,
            generated_message: row.try_get("generated_message")?,
        })
    }

    fn row_to_inventory(row: &PgRow) -> Result<InventoryItem> {
        Ok(InventoryItem {
            id: InventoryItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            quantity_on_hand: row.try_get("quantity_on_hand")?,
            minimum_threshold: row.try_get("minimum_threshold")?,
        })
    }

    fn row_to_slot(row: &PgRow) -> Result<ExpeditionSlot> {
        let status: String = row.try_get("status")?;
        Ok(ExpeditionSlot {
            id: SlotId::from_uuid(row.try_get::<Uuid, _>("id")?),
            label: row.try_get("label")?,
            status: match status.as_str() {
                "FREE" => SlotStatus::Free,
                _ => SlotStatus::Occupied,
            },
            order_ref: row
                .try_get::<Option<Uuid>, _>("order_ref")?
                .map(OrderId::from_uuid),
            occupied_at: row.try_get("occupied_at")?,
            released_at: row.try_get("released_at")?,
        })
    }

    async fn load_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, style, material, sole, color, lace_detail,
                   price_cents, production_status, tracking_code,
                   expedition_slot, image_url, generated_message
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn upsert_item(
        tx: &mut Transaction<'_, Postgres>,
        item: &OrderItem,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items
                (id, order_id, style, material, sole, color, lace_detail,
                 price_cents, production_status, tracking_code,
                 expedition_slot, image_url, generated_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                style = EXCLUDED.style,
                material = EXCLUDED.material,
                sole = EXCLUDED.sole,
                color = EXCLUDED.color,
                lace_detail = EXCLUDED.lace_detail,
                price_cents = EXCLUDED.price_cents,
                production_status = EXCLUDED.production_status,
                tracking_code = EXCLUDED.tracking_code,
                expedition_slot = EXCLUDED.expedition_slot,
                image_url = EXCLUDED.image_url,
                generated_message = EXCLUDED.generated_message
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.config.style.as_str())
        .bind(item.config.material.as_str())
        .bind(item.config.sole.as_str())
        .bind(item.config.color.as_str())
        .bind(item.config.lace_detail.as_str())
        .bind(item.price.cents())
        .bind(item.production_status.as_str())
        .bind(item.tracking_code.as_ref().map(|t| t.as_str().to_string()))
        .bind(item.expedition_slot.map(|s| s.as_uuid()))
        .bind(&item.image_url)
        .bind(&item.generated_message)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn deduct_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
        quantity: u32,
        strict: bool,
    ) -> Result<()> {
        let quantity = i64::from(quantity);
        let affected = if strict {
            sqlx::query(
                "UPDATE inventory_items SET quantity_on_hand = quantity_on_hand - $2 \
                 WHERE code = $1 AND quantity_on_hand >= $2",
            )
            .bind(code)
            .bind(quantity)
            .execute(&mut **tx)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                "UPDATE inventory_items SET quantity_on_hand = quantity_on_hand - $2 \
                 WHERE code = $1",
            )
            .bind(code)
            .bind(quantity)
            .execute(&mut **tx)
            .await?
            .rows_affected()
        };

        if affected == 0 {
            let on_hand: Option<i64> =
                sqlx::query_scalar("SELECT quantity_on_hand FROM inventory_items WHERE code = $1")
                    .bind(code)
                    .fetch_optional(&mut **tx)
                    .await?;
            match on_hand {
                Some(on_hand) => {
                    return Err(StoreError::InsufficientStock {
                        code: code.to_string(),
                        on_hand,
                        requested: quantity as u32,
                    });
                }
                None => {
                    tracing::warn!(code, "deduct for unknown inventory code ignored");
                }
            }
        }

        Ok(())
    }

    async fn bind_slot_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        slot_label: Option<&str>,
        order_id: OrderId,
    ) -> Result<(SlotId, String)> {
        let row = match slot_label {
            Some(label) => {
                let row = sqlx::query(
                    r#"
                    UPDATE expedition_slots
                    SET status = 'OCCUPIED', order_ref = $2, occupied_at = now()
                    WHERE label = $1 AND status = 'FREE'
                    RETURNING id, label
                    "#,
                )
                .bind(label)
                .bind(order_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;

                match row {
                    Some(row) => row,
                    None => {
                        let exists: Option<i64> = sqlx::query_scalar(
                            "SELECT 1 FROM expedition_slots WHERE label = $1",
                        )
                        .bind(label)
                        .fetch_optional(&mut **tx)
                        .await?;
                        return Err(match exists {
                            Some(_) => StoreError::SlotOccupied(label.to_string()),
                            None => StoreError::SlotNotFound(label.to_string()),
                        });
                    }
                }
            }
            None => sqlx::query(
                r#"
                UPDATE expedition_slots
                SET status = 'OCCUPIED', order_ref = $1, occupied_at = now()
                WHERE id = (
                    SELECT id FROM expedition_slots
                    WHERE status = 'FREE'
                    LIMIT 1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING id, label
                "#,
            )
            .bind(order_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::NoFreeSlot)?,
        };

        Ok((
            SlotId::from_uuid(row.try_get::<Uuid, _>("id")?),
            row.try_get("label")?,
        ))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, total_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total_value.cents())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            Self::upsert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, total_cents, created_at FROM orders WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut order = Self::row_to_order(&row)?;
                order.items = self.load_items(order_id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, status, total_cents, created_at
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut order = Self::row_to_order(row)?;
            order.items = self.load_items(order.id).await?;
            orders.push(order);
        }
        Ok(orders)
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let affected = sqlx::query(
            "UPDATE orders SET status = $2, total_cents = $3 WHERE id = $1",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total_value.cents())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::OrderNotFound(order.id));
        }

        let kept: Vec<Uuid> = order.items.iter().map(|i| i.id.as_uuid()).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(order.id.as_uuid())
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        for item in &order.items {
            Self::upsert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        let affected = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn find_order_by_tracking(&self, tracking: &CorrelationId) -> Result<Option<Order>> {
        let order_id: Option<Uuid> =
            sqlx::query_scalar("SELECT order_id FROM order_items WHERE tracking_code = $1")
                .bind(tracking.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match order_id {
            Some(id) => self.get_order(OrderId::from_uuid(id)).await,
            None => Ok(None),
        }
    }

    async fn record_production_finished(
        &self,
        tracking: &CorrelationId,
        slot_label: Option<&str>,
        strict: bool,
    ) -> Result<ProductionRecord> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, order_id, style, material, sole, color, lace_detail,
                   price_cents, production_status, tracking_code,
                   expedition_slot, image_url, generated_message
            FROM order_items
            WHERE tracking_code = $1
            FOR UPDATE
            "#,
        )
        .bind(tracking.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::TrackingCodeNotFound(tracking.clone()))?;

        let item = Self::row_to_item(&row)?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(item.order_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let current_status = parse_order_status(&status)?;

        // Terminal orders accept no further production events.
        if current_status.is_terminal() {
            return Err(StoreError::Domain(domain::OrderError::OrderClosed {
                order_id: item.order_id,
                status: current_status,
            }));
        }

        if item.production_status == ProductionStatus::Ready {
            // Duplicate callback: report the existing binding, change nothing.
            let slot_label: String = match item.expedition_slot {
                Some(slot_id) => sqlx::query_scalar(
                    "SELECT label FROM expedition_slots WHERE id = $1",
                )
                .bind(slot_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or_default(),
                None => String::new(),
            };
            return Ok(ProductionRecord {
                order_id: item.order_id,
                item_id: item.id,
                slot_label,
                order_status: current_status,
                deducted: false,
            });
        }
        if item.production_status == ProductionStatus::FailedSubmission {
            return Err(StoreError::Domain(domain::OrderError::ItemSubmissionFailed {
                item_id: item.id,
            }));
        }

        for d in mapper::to_inventory_deductions(&item.config) {
            Self::deduct_in_tx(&mut tx, &d.code, d.quantity, strict).await?;
        }

        let (slot_id, slot_label) =
            Self::bind_slot_in_tx(&mut tx, slot_label, item.order_id).await?;

        sqlx::query(
            "UPDATE order_items SET production_status = $2, expedition_slot = $3 WHERE id = $1",
        )
        .bind(item.id.as_uuid())
        .bind(ProductionStatus::Ready.as_str())
        .bind(slot_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let statuses: Vec<String> = sqlx::query_scalar(
            "SELECT production_status FROM order_items WHERE order_id = $1",
        )
        .bind(item.order_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;
        let statuses = statuses
            .iter()
            .map(|s| parse_production_status(s))
            .collect::<Result<Vec<_>>>()?;
        let order_status = OrderStatus::derive(&statuses);

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(item.order_id.as_uuid())
            .bind(order_status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ProductionRecord {
            order_id: item.order_id,
            item_id: item.id,
            slot_label,
            order_status,
            deducted: true,
        })
    }

    async fn record_delivery(&self, order_id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::OrderNotFound(order_id))?;
        let current_status = parse_order_status(&status)?;
        if !current_status.can_confirm_delivery() {
            return Err(StoreError::Domain(domain::OrderError::NotCompleted {
                order_id,
                status: current_status,
            }));
        }

        sqlx::query(
            r#"
            UPDATE expedition_slots
            SET status = 'FREE', order_ref = NULL, released_at = now()
            WHERE order_ref = $1 AND status = 'OCCUPIED'
            "#,
        )
        .bind(order_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(OrderStatus::Delivered.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_order(order_id)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn deduct(&self, code: &str, quantity: u32, strict: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::deduct_in_tx(&mut tx, code, quantity, strict).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn restock(&self, code: &str, quantity: u32) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE inventory_items SET quantity_on_hand = quantity_on_hand + $2 WHERE code = $1",
        )
        .bind(code)
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            tracing::warn!(code, "restock for unknown inventory code ignored");
        }
        Ok(())
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, name, category, quantity_on_hand, minimum_threshold
            FROM inventory_items
            ORDER BY category ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_inventory).collect()
    }

    async fn manual_restock(
        &self,
        item_id: InventoryItemId,
        quantity: u32,
    ) -> Result<InventoryItem> {
        let row = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity_on_hand = quantity_on_hand + $2
            WHERE id = $1
            RETURNING id, code, name, category, quantity_on_hand, minimum_threshold
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::InventoryItemNotFound(item_id))?;

        Self::row_to_inventory(&row)
    }

    async fn allocate_slot(&self, order_id: OrderId) -> Result<ExpeditionSlot> {
        let mut tx = self.pool.begin().await?;
        let (slot_id, _) = Self::bind_slot_in_tx(&mut tx, None, order_id).await?;
        let row = sqlx::query(
            r#"
            SELECT id, label, status, order_ref, occupied_at, released_at
            FROM expedition_slots WHERE id = $1
            "#,
        )
        .bind(slot_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Self::row_to_slot(&row)
    }

    async fn occupy_slot(&self, label: &str, order_id: OrderId) -> Result<ExpeditionSlot> {
        let mut tx = self.pool.begin().await?;
        let (slot_id, _) = Self::bind_slot_in_tx(&mut tx, Some(label), order_id).await?;
        let row = sqlx::query(
            r#"
            SELECT id, label, status, order_ref, occupied_at, released_at
            FROM expedition_slots WHERE id = $1
            "#,
        )
        .bind(slot_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Self::row_to_slot(&row)
    }

    async fn release_slot(&self, order_id: OrderId) -> Result<ExpeditionSlot> {
        let row = sqlx::query(
            r#"
            UPDATE expedition_slots
            SET status = 'FREE', order_ref = NULL, released_at = now()
            WHERE order_ref = $1 AND status = 'OCCUPIED'
            RETURNING id, label, status, order_ref, occupied_at, released_at
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::SlotNotBound(order_id))?;

        Self::row_to_slot(&row)
    }

    async fn count_free_slots(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM expedition_slots WHERE status = 'FREE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_slots(&self) -> Result<Vec<ExpeditionSlot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, label, status, order_ref, occupied_at, released_at
            FROM expedition_slots
            ORDER BY label ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_slot).collect()
    }

    async fn create_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(customer.email.to_lowercase())
        .bind(&customer.password_hash)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("customers_email_key") {
                    return StoreError::DuplicateEmail(customer.email.clone());
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM customers WHERE id = $1",
        )
        .bind(customer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Customer {
                id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                password_hash: row.try_get("password_hash")?,
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            })),
            None => Ok(None),
        }
    }
}

fn parse_order_status(value: &str) -> Result<OrderStatus> {
    match value {
        "PENDING" => Ok(OrderStatus::Pending),
        "COMPLETED" => Ok(OrderStatus::Completed),
        "PARTIALLY_FAILED" => Ok(OrderStatus::PartiallyFailed),
        "DELIVERED" => Ok(OrderStatus::Delivered),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        other => Err(StoreError::Serialization(serde_json::Error::io(
            std::io::Error::other(format!("unknown order status: {other}")),
        ))),
    }
}

fn parse_production_status(value: &str) -> Result<ProductionStatus> {
    match value {
        "QUEUED" => Ok(ProductionStatus::Queued),
        "READY" => Ok(ProductionStatus::Ready),
        "FAILED_SUBMISSION" => Ok(ProductionStatus::FailedSubmission),
        other => Err(StoreError::Serialization(serde_json::Error::io(
            std::io::Error::other(format!("unknown production status: {other}")),
        ))),
    }
}
