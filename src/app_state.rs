//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::ConnectionRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry owning all worker connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Gateway configuration (paths, realm, long-poll timeout).
    pub config: Arc<GatewayConfig>,
}
