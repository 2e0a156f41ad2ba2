//! Inventory ledger endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use common::InventoryItemId;
use fulfillment::ProductionQueue;
use serde::{Deserialize, Serialize};
use store::{InventoryItem, Store};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemResponse {
    pub id: String,
    pub code: String,
    pub name: String,
    pub category: String,
    pub quantity_on_hand: i64,
    pub minimum_threshold: i64,
    pub low: bool,
}

impl From<&InventoryItem> for InventoryItemResponse {
    fn from(item: &InventoryItem) -> Self {
        InventoryItemResponse {
            id: item.id.to_string(),
            code: item.code.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            quantity_on_hand: item.quantity_on_hand,
            minimum_threshold: item.minimum_threshold,
            low: item.is_low(),
        }
    }
}

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
}

/// GET /inventory — list the ledger, grouped by category then name.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
) -> Result<Json<Vec<InventoryItemResponse>>, ApiError> {
    let items = state.store.list_inventory().await?;
    Ok(Json(items.iter().map(InventoryItemResponse::from).collect()))
}

/// POST /inventory/:id/restock — operator restock of one ledger entry.
#[tracing::instrument(skip(state, req))]
pub async fn restock<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest(
            "restock quantity must be positive".to_string(),
        ));
    }
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("invalid inventory item id: {e}")))?;
    let item = state
        .store
        .manual_restock(InventoryItemId::from_uuid(uuid), req.quantity)
        .await?;

    metrics::counter!("inventory_restocks_total").increment(1);
    Ok(Json(InventoryItemResponse::from(&item)))
}
