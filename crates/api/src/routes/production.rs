//! Inbound production callback webhook.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use common::CorrelationId;
use fulfillment::{CallbackOutcome, ProductionQueue};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// Body the production machine posts when an item changes state.
#[derive(Deserialize)]
pub struct ProductionCallbackRequest {
    /// Correlation id assigned at submission time.
    pub id: String,
    pub status: String,
    /// Physical slot label the machine placed the item in.
    pub slot: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionCallbackResponse {
    pub acknowledged: bool,
    pub applied: bool,
    pub order_status: Option<String>,
}

/// POST /callbacks/production — production machine status report.
///
/// Only `FINISHED` changes state; every other status is acknowledged
/// and ignored. Unknown correlation ids are a 404 so a misrouted
/// machine is visible to operators.
#[tracing::instrument(skip(state, req), fields(tracking = %req.id, status = %req.status))]
pub async fn callback<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Json(req): Json<ProductionCallbackRequest>,
) -> Result<Json<ProductionCallbackResponse>, ApiError> {
    let tracking = CorrelationId::new(req.id);
    let outcome = state
        .fulfillment
        .handle_callback(&tracking, &req.status, req.slot.as_deref())
        .await?;

    let response = match outcome {
        CallbackOutcome::Ignored => ProductionCallbackResponse {
            acknowledged: true,
            applied: false,
            order_status: None,
        },
        CallbackOutcome::Applied(record) => ProductionCallbackResponse {
            acknowledged: true,
            applied: true,
            order_status: Some(record.order_status.as_str().to_string()),
        },
        CallbackOutcome::Duplicate(record) => ProductionCallbackResponse {
            acknowledged: true,
            applied: false,
            order_status: Some(record.order_status.as_str().to_string()),
        },
    };

    Ok(Json(response))
}
