//! Order endpoints: placement, lookup, item edits, production
//! submission, delivery confirmation and cancellation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use common::{CustomerId, OrderId, OrderItemId};
use domain::Order;
use fulfillment::{FulfillmentService, ProductionQueue, RawItemConfig};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store, Q: ProductionQueue> {
    pub fulfillment: FulfillmentService<S, Q>,
    pub store: S,
}

/// Header carrying the requesting customer's id.
pub const CUSTOMER_HEADER: &str = "x-customer-id";

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub items: Vec<RawItemConfig>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub total_cents: i64,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: String,
    pub style: String,
    pub material: String,
    pub sole: String,
    pub color: String,
    pub lace_detail: String,
    pub price_cents: i64,
    pub production_status: String,
    pub tracking_code: Option<String>,
    pub image_url: Option<String>,
    pub generated_message: Option<String>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            status: order.status.as_str().to_string(),
            total_cents: order.total_value.cents(),
            created_at: order.created_at.to_rfc3339(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    id: item.id.to_string(),
                    style: item.config.style.as_str().to_string(),
                    material: item.config.material.as_str().to_string(),
                    sole: item.config.sole.as_str().to_string(),
                    color: item.config.color.as_str().to_string(),
                    lace_detail: item.config.lace_detail.as_str().to_string(),
                    price_cents: item.price.cents(),
                    production_status: item.production_status.as_str().to_string(),
                    tracking_code: item.tracking_code.as_ref().map(|t| t.as_str().to_string()),
                    image_url: item.image_url.clone(),
                    generated_message: item.generated_message.clone(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — place an order for a customer.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = parse_customer_id(&req.customer_id)?;
    let order = state.fulfillment.place_order(customer_id, req.items).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/:id — load an order; the requesting customer must own it.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let requester = requesting_customer(&headers)?;

    let order = state.fulfillment.get_order(order_id).await?;
    check_owner(&order, requester)?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /customers/:id/orders — list a customer's orders.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let customer_id = parse_customer_id(&id)?;
    let requester = requesting_customer(&headers)?;
    if requester != customer_id {
        return Err(ApiError::Forbidden(
            "orders belong to another customer".to_string(),
        ));
    }

    let orders = state.fulfillment.list_orders(customer_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// PUT /orders/:id/items/:item_id — replace an item's configuration.
#[tracing::instrument(skip(state, headers, raw))]
pub async fn edit_item<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(raw): Json<RawItemConfig>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let item_id = parse_item_id(&item_id)?;
    let requester = requesting_customer(&headers)?;

    let order = state.fulfillment.get_order(order_id).await?;
    check_owner(&order, requester)?;

    let order = state.fulfillment.edit_item(order_id, item_id, raw).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /orders/:id/items/:item_id — remove an item.
///
/// Removing the last item deletes the whole order (204).
#[tracing::instrument(skip(state, headers))]
pub async fn remove_item<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;

    let order_id = parse_order_id(&id)?;
    let item_id = parse_item_id(&item_id)?;
    let requester = requesting_customer(&headers)?;

    let order = state.fulfillment.get_order(order_id).await?;
    check_owner(&order, requester)?;

    match state.fulfillment.remove_item(order_id, item_id).await? {
        Some(order) => Ok(Json(OrderResponse::from(&order)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /orders/:id/submit — submit queued items to production.
#[tracing::instrument(skip(state))]
pub async fn submit<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.fulfillment.submit_to_production(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/delivery — confirm delivery of a completed order.
#[tracing::instrument(skip(state))]
pub async fn confirm_delivery<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.fulfillment.confirm_delivery(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/cancel — cancel an order before production.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.fulfillment.cancel_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

// -- Helpers --

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

fn parse_item_id(id: &str) -> Result<OrderItemId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid item id: {e}")))?;
    Ok(OrderItemId::from_uuid(uuid))
}

pub(crate) fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid customer id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

fn requesting_customer(headers: &HeaderMap) -> Result<CustomerId, ApiError> {
    let value = headers
        .get(CUSTOMER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::BadRequest(format!("missing {CUSTOMER_HEADER} header"))
        })?;
    parse_customer_id(value)
}

fn check_owner(order: &Order, requester: CustomerId) -> Result<(), ApiError> {
    if order.customer_id != requester {
        return Err(ApiError::Forbidden(
            "order belongs to another customer".to_string(),
        ));
    }
    Ok(())
}
