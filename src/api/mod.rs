//! HTTP layer: getwork endpoints, system endpoints, router composition.
//!
//! Endpoint paths come from [`GatewayConfig`], because legacy miner
//! deployments differ in where they expect the getwork URL to live; the
//! defaults are `/` and `/longpolling`.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::get;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::app_state::AppState;
use crate::config::GatewayConfig;

/// Advertises long-poll support; present on every response.
pub const X_MINING_EXTENSIONS: HeaderName = HeaderName::from_static("x-mining-extensions");
/// Tells conforming miners where the long-poll endpoint lives.
pub const X_LONG_POLLING: HeaderName = HeaderName::from_static("x-long-polling");
/// Carries the advisory rejection reason for a refused share.
pub const X_REJECT_REASON: HeaderName = HeaderName::from_static("x-reject-reason");

/// Builds the complete router: getwork, long-poll, and system endpoints.
///
/// The `X-Mining-Extensions: longpoll` header is layered onto every
/// response, error responses included.
pub fn build_router(config: &GatewayConfig) -> Router<AppState> {
    Router::new()
        .route(
            &config.getwork_path,
            get(handlers::getwork::getwork_handler).post(handlers::getwork::getwork_handler),
        )
        .route(
            &config.longpoll_path,
            get(handlers::getwork::longpoll_handler).post(handlers::getwork::longpoll_handler),
        )
        .merge(handlers::system::routes())
        .layer(SetResponseHeaderLayer::overriding(
            X_MINING_EXTENSIONS,
            HeaderValue::from_static("longpoll"),
        ))
}
