//! Customer account endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use fulfillment::ProductionQueue;
use serde::{Deserialize, Serialize};
use store::{auth, Customer, Store};

use crate::error::ApiError;
use crate::routes::orders::{parse_customer_id, AppState};

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<&Customer> for CustomerResponse {
    fn from(customer: &Customer) -> Self {
        CustomerResponse {
            id: customer.id.to_string(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            created_at: customer.created_at.to_rfc3339(),
        }
    }
}

/// POST /customers — register a customer account.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn create<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name and email are required".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let hash = auth::hash_password(&req.password)?;
    let customer = Customer::new(req.name, req.email, hash);
    state.store.create_customer(&customer).await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(&customer))))
}

/// GET /customers/:id — fetch a customer account.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static, Q: ProductionQueue + 'static>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer_id = parse_customer_id(&id)?;
    let customer = state
        .store
        .get_customer(customer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("customer {id} not found")))?;

    Ok(Json(CustomerResponse::from(&customer)))
}
