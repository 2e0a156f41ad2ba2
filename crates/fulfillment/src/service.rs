//! Fulfillment workflow orchestration.
//!
//! Drives an order from placement through production submission, the
//! production-finished callback, and delivery confirmation. Submission
//! failures are soft and per-item: sibling items that already reached
//! the production queue are never rolled back.

use std::time::Duration;

use common::{CorrelationId, CustomerId, OrderId, OrderItemId};
use domain::{mapper, Order, ProductionStatus, SneakerConfig};
use serde::Deserialize;
use store::{ProductionRecord, Store, StoreError};

use crate::error::{FulfillmentError, Result};
use crate::services::generators::{ImageChain, MessageChain};
use crate::services::production::ProductionQueue;

/// Attempts made per item before a submission counts as failed.
const SUBMIT_ATTEMPTS: u32 = 3;

/// Initial backoff between submission attempts; doubles per retry.
const SUBMIT_BACKOFF: Duration = Duration::from_millis(100);

/// Raw five-step configuration as received from the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemConfig {
    pub style: Option<String>,
    pub material: Option<String>,
    pub sole: Option<String>,
    pub color: Option<String>,
    pub lace_detail: Option<String>,
}

impl RawItemConfig {
    fn parse(&self) -> std::result::Result<SneakerConfig, domain::CatalogError> {
        SneakerConfig::from_raw(
            self.style.as_deref(),
            self.material.as_deref(),
            self.sole.as_deref(),
            self.color.as_deref(),
            self.lace_detail.as_deref(),
        )
    }
}

/// Outcome of handling a production callback.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// Status other than "FINISHED": acknowledged and ignored.
    Ignored,
    /// First FINISHED delivery: inventory deducted, item marked ready.
    Applied(ProductionRecord),
    /// Repeat FINISHED delivery: no state changed.
    Duplicate(ProductionRecord),
}

/// Orchestrates the fulfillment workflow over a store, the production
/// queue, and the content provider chains.
pub struct FulfillmentService<S, Q>
where
    S: Store,
    Q: ProductionQueue,
{
    store: S,
    production: Q,
    images: ImageChain,
    messages: MessageChain,
    strict_inventory: bool,
}

impl<S, Q> FulfillmentService<S, Q>
where
    S: Store,
    Q: ProductionQueue,
{
    /// Creates a new fulfillment service.
    pub fn new(store: S, production: Q, images: ImageChain, messages: MessageChain) -> Self {
        Self {
            store,
            production,
            images,
            messages,
            strict_inventory: false,
        }
    }

    /// Enables strict inventory mode: deductions that would push a
    /// ledger entry negative reject the whole callback.
    pub fn with_strict_inventory(mut self, strict: bool) -> Self {
        self.strict_inventory = strict;
        self
    }

    /// Access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order for a customer from raw item configurations.
    ///
    /// Every configuration must name all five steps with known options;
    /// the first offending step is reported otherwise. Preview image and
    /// marketing message are generated per item and never block the
    /// order on a vendor failure.
    #[tracing::instrument(skip(self, raw_items), fields(item_count = raw_items.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        raw_items: Vec<RawItemConfig>,
    ) -> Result<Order> {
        self.store
            .get_customer(customer_id)
            .await?
            .ok_or(FulfillmentError::CustomerNotFound(customer_id))?;

        let configs = raw_items
            .iter()
            .map(RawItemConfig::parse)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut order = Order::new(customer_id, configs)?;
        for item in &mut order.items {
            item.image_url = Some(self.images.generate(&item.config).await);
            item.generated_message = Some(self.messages.generate(&item.config).await);
        }

        self.store.create_order(&order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total_value, "order placed");
        Ok(order)
    }

    /// Loads an order by id.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        Ok(self.store.list_orders_for_customer(customer_id).await?)
    }

    /// Replaces an item's configuration, recomputing its price and the
    /// order total. Only allowed while the item is still queued.
    #[tracing::instrument(skip(self, raw))]
    pub async fn edit_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        raw: RawItemConfig,
    ) -> Result<Order> {
        let config = raw.parse()?;
        let mut order = self.get_order(order_id).await?;

        order.edit_item(item_id, config)?;
        if let Some(item) = order.item_mut(item_id) {
            item.image_url = Some(self.images.generate(&config).await);
            item.generated_message = Some(self.messages.generate(&config).await);
        }

        self.store.save_order(&order).await?;
        Ok(order)
    }

    /// Removes an item from an order.
    ///
    /// Removing the last item deletes the order and returns `None`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
    ) -> Result<Option<Order>> {
        let mut order = self.get_order(order_id).await?;
        let was_last = order.remove_item(item_id)?;

        if was_last {
            self.store.delete_order(order_id).await?;
            tracing::info!(%order_id, "last item removed, order deleted");
            return Ok(None);
        }

        self.store.save_order(&order).await?;
        Ok(Some(order))
    }

    /// Submits every queued, not-yet-submitted item of an order to the
    /// production queue.
    ///
    /// Transport failures are retried with backoff; an item whose
    /// submission keeps failing becomes `FailedSubmission` while its
    /// siblings proceed. The order status reflects the mix afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn submit_to_production(&self, order_id: OrderId) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;
        if !order.status.can_submit() {
            return Err(domain::OrderError::NotSubmittable {
                order_id,
                status: order.status,
            }
            .into());
        }
        let mut failures = 0u32;

        for item in &mut order.items {
            if item.production_status != ProductionStatus::Queued || item.tracking_code.is_some() {
                continue;
            }

            let payload = mapper::to_production_payload(&item.config);
            match submit_with_retry(&self.production, &payload).await {
                Ok(tracking) => {
                    tracing::info!(item_id = %item.id, %tracking, "item submitted to production");
                    item.tracking_code = Some(tracking);
                }
                Err(e) => {
                    tracing::warn!(item_id = %item.id, error = %e, "item submission failed");
                    item.mark_submission_failed();
                    failures += 1;
                }
            }
        }

        order.recompute_status();
        self.store.save_order(&order).await?;

        metrics::counter!("production_submissions_total").increment(1);
        if failures > 0 {
            metrics::counter!("production_submission_failures_total").increment(failures.into());
        }
        Ok(order)
    }

    /// Handles a production callback for a correlation id.
    ///
    /// Any status other than `FINISHED` is acknowledged and ignored. A
    /// FINISHED callback atomically deducts the item's inventory set,
    /// marks the item ready, binds the reported slot (or any free slot
    /// when none is reported) and re-derives the order status; a repeat
    /// delivery for the same correlation id changes nothing.
    #[tracing::instrument(skip(self), fields(tracking = %tracking))]
    pub async fn handle_callback(
        &self,
        tracking: &CorrelationId,
        status: &str,
        slot_label: Option<&str>,
    ) -> Result<CallbackOutcome> {
        if status != "FINISHED" {
            tracing::debug!(status, "non-finished callback ignored");
            return Ok(CallbackOutcome::Ignored);
        }

        let record = self
            .store
            .record_production_finished(tracking, slot_label, self.strict_inventory)
            .await?;

        if record.deducted {
            metrics::counter!("production_finished_total").increment(1);
            tracing::info!(
                order_id = %record.order_id,
                slot = %record.slot_label,
                order_status = record.order_status.as_str(),
                "production finished"
            );
            Ok(CallbackOutcome::Applied(record))
        } else {
            tracing::info!(order_id = %record.order_id, "duplicate finished callback");
            Ok(CallbackOutcome::Duplicate(record))
        }
    }

    /// Confirms delivery of a completed order. The slot releases and the
    /// `Delivered` transition land in one atomic store operation.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_delivery(&self, order_id: OrderId) -> Result<Order> {
        let order = match self.store.record_delivery(order_id).await {
            Ok(order) => order,
            Err(StoreError::OrderNotFound(_)) => {
                return Err(FulfillmentError::OrderNotFound(order_id))
            }
            Err(StoreError::Domain(e)) => return Err(FulfillmentError::Domain(e)),
            Err(e) => return Err(e.into()),
        };

        metrics::counter!("orders_delivered_total").increment(1);
        tracing::info!("order delivered, expedition slots released");
        Ok(order)
    }

    /// Cancels an order while nothing has been produced or submitted.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;
        order.cancel()?;
        self.store.save_order(&order).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(order)
    }
}

async fn submit_with_retry<Q: ProductionQueue>(
    queue: &Q,
    payload: &mapper::ProductionPayload,
) -> Result<CorrelationId> {
    let mut backoff = SUBMIT_BACKOFF;
    let mut last_err = None;

    for attempt in 1..=SUBMIT_ATTEMPTS {
        match queue.submit(payload).await {
            Ok(tracking) => return Ok(tracking),
            Err(e) => {
                if attempt < SUBMIT_ATTEMPTS {
                    tracing::debug!(attempt, error = %e, "submission attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        FulfillmentError::ProductionQueue("submission failed without error".to_string())
    }))
}
