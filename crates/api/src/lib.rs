//! HTTP surface for the sneaker customization storefront.
//!
//! REST endpoints for orders, the production callback webhook, the
//! inventory ledger, the expedition slot pool and customer accounts,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use fulfillment::{
    FulfillmentService, ImageChain, InMemoryProductionQueue, MessageChain, ProductionQueue,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{MemoryStore, Store};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, Q>(state: Arc<AppState<S, Q>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + 'static,
    Q: ProductionQueue + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S, Q>))
        .route("/orders/{id}", get(routes::orders::get::<S, Q>))
        .route(
            "/orders/{id}/items/{item_id}",
            put(routes::orders::edit_item::<S, Q>),
        )
        .route(
            "/orders/{id}/items/{item_id}",
            delete(routes::orders::remove_item::<S, Q>),
        )
        .route("/orders/{id}/submit", post(routes::orders::submit::<S, Q>))
        .route(
            "/orders/{id}/delivery",
            post(routes::orders::confirm_delivery::<S, Q>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, Q>))
        .route("/customers", post(routes::customers::create::<S, Q>))
        .route("/customers/{id}", get(routes::customers::get::<S, Q>))
        .route(
            "/customers/{id}/orders",
            get(routes::orders::list::<S, Q>),
        )
        .route(
            "/callbacks/production",
            post(routes::production::callback::<S, Q>),
        )
        .route("/inventory", get(routes::inventory::list::<S, Q>))
        .route(
            "/inventory/{id}/restock",
            post(routes::inventory::restock::<S, Q>),
        )
        .route("/slots", get(routes::slots::list::<S, Q>))
        .route("/slots/free", get(routes::slots::count_free::<S, Q>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over in-memory backends, seeded with the
/// part catalog and a small slot pool. Used for tests and local runs
/// without a database.
pub async fn create_memory_state(
    strict_inventory: bool,
) -> Arc<AppState<MemoryStore, InMemoryProductionQueue>> {
    let store = MemoryStore::new();
    for (code, name, category) in [
        ("B1", "Bloco casual", "blocks"),
        ("B2", "Bloco corrida", "blocks"),
        ("B3", "Bloco skate", "blocks"),
        ("M1", "Couro", "materials"),
        ("M2", "Camurça", "materials"),
        ("M3", "Lona", "materials"),
        ("M4", "Sintético", "materials"),
        ("S1", "Sola borracha", "soles"),
        ("S2", "Sola EVA", "soles"),
        ("S3", "Sola tratorada", "soles"),
        ("L1", "Tinta branca", "colors"),
        ("L2", "Tinta preta", "colors"),
        ("L3", "Tinta vermelha", "colors"),
        ("L4", "Tinta azul", "colors"),
        ("D1", "Cadarço normal", "laces"),
        ("D2", "Cadarço colorido", "laces"),
        ("D3", "Ilhós sem cadarço", "laces"),
    ] {
        store.seed_inventory(code, name, category, 100, 10).await;
    }
    store
        .seed_slots(&["EXP-01", "EXP-02", "EXP-03", "EXP-04", "EXP-05", "EXP-06", "EXP-07", "EXP-08"])
        .await;

    let fulfillment = FulfillmentService::new(
        store.clone(),
        InMemoryProductionQueue::new(),
        ImageChain::new(),
        MessageChain::new(),
    )
    .with_strict_inventory(strict_inventory);

    Arc::new(AppState { fulfillment, store })
}
