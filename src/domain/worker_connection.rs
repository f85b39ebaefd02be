//! Per-address worker session state.
//!
//! Getwork has no connection concept, so [`WorkerConnection`] is the piece
//! that reconstructs session continuity for one remote address: which pool
//! session the miner is bound to, which usernames have been authorized, and
//! which work template the miner last saw.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Duration;

use super::{Credentials, WorkTemplate};
use crate::error::GatewayError;
use crate::manager::{PoolManager, PoolSession};

/// Session state for one remote miner address.
///
/// # Concurrency
///
/// The bound pool reference sits behind its own `RwLock` and is cloned out
/// before any upstream call, so a concurrent [`rebind_to_pool`] is observed
/// atomically and no lock is held across slow pool I/O. The username set and
/// the last-served snapshot are likewise independently locked; operations on
/// different connections never contend.
///
/// [`rebind_to_pool`]: WorkerConnection::rebind_to_pool
#[derive(Debug)]
pub struct WorkerConnection {
    address: IpAddr,
    manager: Arc<dyn PoolManager>,
    pool: RwLock<Arc<dyn PoolSession>>,
    authorized: RwLock<HashSet<String>>,
    last_served: RwLock<Option<WorkTemplate>>,
    created_at: DateTime<Utc>,
}

impl WorkerConnection {
    /// Creates a connection bound to the session the subscribe handshake
    /// produced.
    #[must_use]
    pub fn new(address: IpAddr, manager: Arc<dyn PoolManager>, pool: Arc<dyn PoolSession>) -> Self {
        Self {
            address,
            manager,
            pool: RwLock::new(pool),
            authorized: RwLock::new(HashSet::new()),
            last_served: RwLock::new(None),
            created_at: Utc::now(),
        }
    }

    /// Remote address identifying this worker.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.address
    }

    /// Replaces the bound pool session.
    ///
    /// Called once at creation time and again by the manager on pool
    /// failover. In-flight fetch/submit operations keep the session they
    /// already cloned; the next operation observes the new one.
    pub async fn rebind_to_pool(&self, pool: Arc<dyn PoolSession>) {
        let mut bound = self.pool.write().await;
        tracing::info!(address = %self.address, from = bound.name(), to = pool.name(), "rebinding pool");
        *bound = pool;
    }

    /// Verifies credentials against the bound pool via the manager.
    ///
    /// On success the username is recorded; recording an already-known
    /// username is a no-op. On failure nothing is mutated.
    ///
    /// # Errors
    ///
    /// Propagates [`GatewayError::AuthorizationFailed`] from the manager.
    pub async fn authorize(&self, credentials: &Credentials) -> Result<(), GatewayError> {
        self.manager.authorize(self.address, credentials).await?;
        self.authorized
            .write()
            .await
            .insert(credentials.username.clone());
        Ok(())
    }

    /// Usernames authorized on this connection, sorted for stable output.
    pub async fn authorized_usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.authorized.read().await.iter().cloned().collect();
        names.sort();
        names
    }

    /// Returns the current work template from the bound pool.
    ///
    /// Never blocks awaiting new work; that is the long-poll path's job.
    /// Updates the last-served snapshot consumed by [`long_poll_work`].
    ///
    /// # Errors
    ///
    /// Propagates upstream failures from the session.
    ///
    /// [`long_poll_work`]: WorkerConnection::long_poll_work
    pub async fn current_work(&self) -> Result<WorkTemplate, GatewayError> {
        let session = self.session().await;
        let template = session.current_job().await?;
        self.record_served(&template).await;
        Ok(template)
    }

    /// Forwards a solved share to the bound pool.
    ///
    /// Returns `Some(reason)` when the pool rejects the share; rejection is
    /// advisory and does not fail the request.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures from the session.
    pub async fn submit(
        &self,
        username: &str,
        data: &str,
    ) -> Result<Option<String>, GatewayError> {
        let session = self.session().await;
        session.submit_share(username, data).await
    }

    /// Suspends until new work supersedes what this miner last saw, or the
    /// timeout elapses; returns the then-current template either way.
    ///
    /// The job-bus subscription is taken *before* the snapshot comparison,
    /// so work published in between is never missed. Work that arrived after
    /// the miner's last fetch but before this call is detected by the
    /// comparison and returned without waiting. Dropping the request future
    /// (client hung up) drops the bus receiver; no waiter leaks.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures from the session.
    pub async fn long_poll_work(&self, timeout: Duration) -> Result<WorkTemplate, GatewayError> {
        let session = self.session().await;
        let mut jobs = session.subscribe_jobs();

        let current = session.current_job().await?;
        let already_seen = {
            let last = self.last_served.read().await;
            last.as_ref() == Some(&current)
        };
        if !already_seen {
            self.record_served(&current).await;
            return Ok(current);
        }

        let template = match tokio::time::timeout(timeout, jobs.recv()).await {
            Ok(Ok(template)) => template,
            // Lagged means newer work exists; fetch it. Closed or timeout
            // fall back to whatever the session currently serves.
            Ok(Err(RecvError::Lagged(_) | RecvError::Closed)) | Err(_) => {
                session.current_job().await?
            }
        };
        self.record_served(&template).await;
        Ok(template)
    }

    /// Snapshot of this connection for the status surface.
    pub async fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            address: self.address,
            pool: self.session().await.name().to_string(),
            authorized_usernames: self.authorized_usernames().await,
            created_at: self.created_at,
        }
    }

    async fn session(&self) -> Arc<dyn PoolSession> {
        Arc::clone(&*self.pool.read().await)
    }

    async fn record_served(&self, template: &WorkTemplate) {
        *self.last_served.write().await = Some(template.clone());
    }
}

/// Lightweight view of a connection for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    /// Remote miner address.
    pub address: IpAddr,
    /// Name of the bound pool session.
    pub pool: String,
    /// Usernames authorized on this connection.
    pub authorized_usernames: Vec<String>,
    /// When the connection was first subscribed.
    pub created_at: DateTime<Utc>,
}
