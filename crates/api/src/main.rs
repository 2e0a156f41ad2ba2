//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::orders::AppState;
use fulfillment::{
    FulfillmentService, HttpImageGenerator, HttpMessageGenerator, HttpProductionQueue, ImageChain,
    MessageChain,
};
use sqlx::postgres::PgPoolOptions;
use store::PostgresStore;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve(app: axum::Router, addr: &str) {
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build state: PostgreSQL when DATABASE_URL is set, in-memory otherwise
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool);
            store.run_migrations().await.expect("migrations failed");

            let client = reqwest::Client::new();
            let production_url = config
                .production_url
                .clone()
                .unwrap_or_else(|| "http://localhost:4100".to_string());
            let production = HttpProductionQueue::new(client.clone(), production_url);

            let mut images = ImageChain::new().with_timeout(config.provider_timeout);
            if let Some(url) = &config.image_provider_url {
                images = images
                    .with_provider(Arc::new(HttpImageGenerator::new(client.clone(), url.clone())));
            }
            let mut messages = MessageChain::new().with_timeout(config.provider_timeout);
            if let Some(url) = &config.message_provider_url {
                messages = messages.with_provider(Arc::new(HttpMessageGenerator::new(
                    client.clone(),
                    url.clone(),
                )));
            }

            let fulfillment =
                FulfillmentService::new(store.clone(), production, images, messages)
                    .with_strict_inventory(config.inventory_strict);
            let state = Arc::new(AppState { fulfillment, store });
            api::create_app(state, metrics_handle)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory backends");
            let state = api::create_memory_state(config.inventory_strict).await;
            api::create_app(state, metrics_handle)
        }
    };

    // 4. Start server
    serve(app, &config.addr()).await;
}
