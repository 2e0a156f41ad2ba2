//! Expedition slot pool endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use fulfillment::ProductionQueue;
use serde::Serialize;
use store::{ExpeditionSlot, SlotStatus, Store};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub id: String,
    pub label: String,
    pub status: String,
    pub order_ref: Option<String>,
    pub occupied_at: Option<String>,
    pub released_at: Option<String>,
}

impl From<&ExpeditionSlot> for SlotResponse {
    fn from(slot: &ExpeditionSlot) -> Self {
        SlotResponse {
            id: slot.id.to_string(),
            label: slot.label.clone(),
            status: match slot.status {
                SlotStatus::Free => "FREE".to_string(),
                SlotStatus::Occupied => "OCCUPIED".to_string(),
            },
            order_ref: slot.order_ref.map(|o| o.to_string()),
            occupied_at: slot.occupied_at.map(|t| t.to_rfc3339()),
            released_at: slot.released_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct FreeSlotsResponse {
    pub free: i64,
}

/// GET /slots — list the slot pool.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
) -> Result<Json<Vec<SlotResponse>>, ApiError> {
    let slots = state.store.list_slots().await?;
    Ok(Json(slots.iter().map(SlotResponse::from).collect()))
}

/// GET /slots/free — free slot count for capacity display.
#[tracing::instrument(skip(state))]
pub async fn count_free<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
) -> Result<Json<FreeSlotsResponse>, ApiError> {
    let free = state.store.count_free_slots().await?;
    Ok(Json(FreeSlotsResponse { free }))
}
