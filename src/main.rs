//! getwork-gateway server entry point.
//!
//! Starts the Axum HTTP server with the getwork, long-poll, and system
//! endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use getwork_gateway::api;
use getwork_gateway::app_state::AppState;
use getwork_gateway::config::GatewayConfig;
use getwork_gateway::domain::{ConnectionRegistry, WorkTemplate};
use getwork_gateway::manager::{FixedPoolConfig, FixedPoolManager, PoolManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env().map_err(|err| anyhow::anyhow!(err.to_string()))?;
    tracing::info!(addr = %config.listen_addr, "starting getwork-gateway");

    // Build the upstream backend
    let manager = Arc::new(FixedPoolManager::new(FixedPoolConfig {
        pool_name: "fixed".to_string(),
        template: WorkTemplate::new(config.work_data.clone(), config.work_target.clone()),
        password: config.pool_password.clone(),
        max_workers: config.max_workers,
        job_bus_capacity: config.job_bus_capacity,
    }));

    // Build domain layer
    let registry = Arc::new(ConnectionRegistry::new(manager as Arc<dyn PoolManager>));

    // Build application state
    let config = Arc::new(config);
    let app_state = AppState {
        registry,
        config: Arc::clone(&config),
    };

    // Build router
    let app = api::build_router(&config)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start server; the dispatcher keys connections on the peer address.
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
