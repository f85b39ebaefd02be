//! Built-in single-pool backend serving operator-configured work.
//!
//! [`FixedPoolManager`] binds every worker to one [`FixedPoolSession`] that
//! serves a fixed [`WorkTemplate`] until [`FixedPoolManager::publish_work`]
//! replaces it. Useful for smoke-testing miners against the gateway without
//! a live upstream, and as the default backend wired up by `main`.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, broadcast};

use super::{PoolManager, PoolSession};
use crate::domain::{Credentials, JobBus, WorkTemplate};
use crate::error::GatewayError;

/// Configuration for the built-in backend.
#[derive(Debug, Clone)]
pub struct FixedPoolConfig {
    /// Pool name reported in logs and the status surface.
    pub pool_name: String,
    /// Initial work template served to all miners.
    pub template: WorkTemplate,
    /// Password every worker must present, or `None` to accept all.
    pub password: Option<String>,
    /// Maximum number of distinct worker addresses. `0` means unlimited.
    pub max_workers: usize,
    /// Capacity of the new-work broadcast channel.
    pub job_bus_capacity: usize,
}

/// Single-pool manager implementation.
#[derive(Debug)]
pub struct FixedPoolManager {
    session: Arc<FixedPoolSession>,
    password: Option<String>,
    max_workers: usize,
    workers: Mutex<HashSet<IpAddr>>,
}

impl FixedPoolManager {
    /// Creates a manager serving the configured template.
    #[must_use]
    pub fn new(config: FixedPoolConfig) -> Self {
        let session = Arc::new(FixedPoolSession {
            name: config.pool_name,
            template: RwLock::new(config.template),
            bus: JobBus::new(config.job_bus_capacity),
        });
        Self {
            session,
            password: config.password,
            max_workers: config.max_workers,
            workers: Mutex::new(HashSet::new()),
        }
    }

    /// Replaces the served template and wakes all pending long-polls.
    pub async fn publish_work(&self, template: WorkTemplate) {
        self.session.publish_work(template).await;
    }

    /// Number of currently subscribed worker addresses.
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }
}

#[async_trait]
impl PoolManager for FixedPoolManager {
    async fn subscribe(&self, addr: IpAddr) -> Result<Arc<dyn PoolSession>, GatewayError> {
        let mut workers = self.workers.lock().await;
        if !workers.contains(&addr) && self.max_workers > 0 && workers.len() >= self.max_workers {
            tracing::warn!(%addr, limit = self.max_workers, "worker limit reached");
            return Err(GatewayError::WorkerLimitExceeded);
        }
        workers.insert(addr);
        tracing::info!(%addr, pool = %self.session.name, "worker subscribed");
        Ok(Arc::clone(&self.session) as Arc<dyn PoolSession>)
    }

    async fn authorize(
        &self,
        addr: IpAddr,
        credentials: &Credentials,
    ) -> Result<(), GatewayError> {
        if let Some(required) = &self.password
            && credentials.password != *required
        {
            tracing::warn!(%addr, username = %credentials.username, "authorization rejected");
            return Err(GatewayError::AuthorizationFailed {
                username: credentials.username.clone(),
            });
        }
        tracing::debug!(%addr, username = %credentials.username, "worker authorized");
        Ok(())
    }

    async fn notify_disconnected(&self, addr: IpAddr, reason: &str) {
        self.workers.lock().await.remove(&addr);
        tracing::info!(%addr, reason, "worker disconnected");
    }
}

/// The one session every worker of a [`FixedPoolManager`] is bound to.
#[derive(Debug)]
pub struct FixedPoolSession {
    name: String,
    template: RwLock<WorkTemplate>,
    bus: JobBus,
}

impl FixedPoolSession {
    /// Replaces the served template and broadcasts it.
    pub async fn publish_work(&self, template: WorkTemplate) {
        *self.template.write().await = template.clone();
        let woken = self.bus.publish(template);
        tracing::debug!(pool = %self.name, woken, "published new work");
    }
}

#[async_trait]
impl PoolSession for FixedPoolSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_job(&self) -> Result<WorkTemplate, GatewayError> {
        Ok(self.template.read().await.clone())
    }

    async fn submit_share(
        &self,
        username: &str,
        data: &str,
    ) -> Result<Option<String>, GatewayError> {
        tracing::info!(pool = %self.name, username, bytes = data.len() / 2, "share received");
        Ok(None)
    }

    fn subscribe_jobs(&self) -> broadcast::Receiver<WorkTemplate> {
        self.bus.subscribe()
    }
}
