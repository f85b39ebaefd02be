//! Upstream pool-session manager boundary.
//!
//! The gateway never speaks the upstream pool protocol itself; it consumes
//! sessions through [`PoolManager`] and [`PoolSession`]. A production
//! deployment plugs a Stratum session layer in behind these traits; the
//! built-in [`FixedPoolManager`] serves operator-configured work so the
//! binary runs standalone.

pub mod fixed;

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{Credentials, WorkTemplate};
use crate::error::GatewayError;

pub use fixed::{FixedPoolConfig, FixedPoolManager};

/// Upstream manager: establishes and tears down per-worker pool sessions.
///
/// Implementations own the pool objects; the gateway holds non-owning
/// `Arc<dyn PoolSession>` references that the manager may rebind on
/// failover. Retry policy, if any, lives behind this boundary.
#[async_trait]
pub trait PoolManager: Send + Sync + std::fmt::Debug {
    /// Performs the subscribe handshake for a new worker.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NoPoolAvailable`] when no upstream pool can
    /// accept the worker, or [`GatewayError::WorkerLimitExceeded`] when the
    /// upstream worker budget is spent.
    async fn subscribe(&self, addr: IpAddr) -> Result<Arc<dyn PoolSession>, GatewayError>;

    /// Verifies credentials against the worker's bound pool.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthorizationFailed`] when the upstream
    /// rejects the credentials.
    async fn authorize(&self, addr: IpAddr, credentials: &Credentials)
    -> Result<(), GatewayError>;

    /// Fire-and-forget cleanup hook invoked when a worker is evicted.
    async fn notify_disconnected(&self, addr: IpAddr, reason: &str);
}

/// A live upstream pool session bound to one worker.
#[async_trait]
pub trait PoolSession: Send + Sync + std::fmt::Debug {
    /// Human-readable pool identifier, used in logs and the status surface.
    fn name(&self) -> &str;

    /// Returns the current job translated into getwork wire shape.
    ///
    /// Must not block awaiting new work; long-poll suspension is built on
    /// [`PoolSession::subscribe_jobs`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] when the session has no job or
    /// the upstream call fails.
    async fn current_job(&self) -> Result<WorkTemplate, GatewayError>;

    /// Forwards a solved share tagged with the submitting username.
    ///
    /// Returns `Some(reason)` when the pool rejects the share (stale, low
    /// difficulty, duplicate); `None` on acceptance. A rejection is
    /// advisory, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Upstream`] when the submission itself fails.
    async fn submit_share(
        &self,
        username: &str,
        data: &str,
    ) -> Result<Option<String>, GatewayError>;

    /// Subscribes to new-work notifications for this session's pool.
    ///
    /// Every superseding job is broadcast to all receivers; this is the
    /// wake-up mechanism for pending long-polls.
    fn subscribe_jobs(&self) -> broadcast::Receiver<WorkTemplate>;
}
