//! Concurrent address → worker-connection storage.
//!
//! [`ConnectionRegistry`] maps each remote address to its
//! [`WorkerConnection`] behind a `RwLock<HashMap<...>>`, with a per-address
//! [`tokio::sync::OnceCell`] slot so that get-or-create is race-free: under
//! concurrent first contact exactly one subscribe handshake runs, and the
//! connection is published only after it succeeds.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use super::worker_connection::{ConnectionSummary, WorkerConnection};
use crate::error::GatewayError;
use crate::manager::PoolManager;

type ConnectionSlot = Arc<OnceCell<Arc<WorkerConnection>>>;

/// Registry owning the lifetime of all worker connections.
///
/// # Concurrency
///
/// - The outer map lock is held only for key-set mutation, never across the
///   subscribe handshake; unrelated addresses do not serialize behind one
///   another.
/// - The per-address `OnceCell` runs the handshake at most once at a time;
///   losers of the race await the winner's result.
/// - A failed handshake leaves no entry behind, so the next request retries
///   a fresh subscribe. When a failure overlaps a concurrent caller whose
///   retry on the same slot succeeds, the winner re-registers the slot the
///   loser's cleanup removed.
#[derive(Debug)]
pub struct ConnectionRegistry {
    manager: Arc<dyn PoolManager>,
    connections: RwLock<HashMap<IpAddr, ConnectionSlot>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry backed by the given manager.
    #[must_use]
    pub fn new(manager: Arc<dyn PoolManager>) -> Self {
        Self {
            manager,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the connection for `addr`, creating and subscribing it on
    /// first contact.
    ///
    /// # Errors
    ///
    /// Propagates the manager's subscribe failure ([`GatewayError::NoPoolAvailable`],
    /// [`GatewayError::WorkerLimitExceeded`], ...); the address is left
    /// unregistered in that case.
    pub async fn get_or_create(
        &self,
        addr: IpAddr,
    ) -> Result<Arc<WorkerConnection>, GatewayError> {
        let slot = {
            let map = self.connections.read().await;
            map.get(&addr).cloned()
        };
        let slot = match slot {
            Some(slot) => slot,
            None => {
                let mut map = self.connections.write().await;
                Arc::clone(map.entry(addr).or_default())
            }
        };

        let result = slot
            .get_or_try_init(|| async {
                tracing::debug!(%addr, "no existing connection, subscribing");
                let session = self.manager.subscribe(addr).await?;
                Ok(Arc::new(WorkerConnection::new(
                    addr,
                    Arc::clone(&self.manager),
                    session,
                )))
            })
            .await;

        match result {
            Ok(connection) => {
                let connection = Arc::clone(connection);
                // A concurrently failed initializer may have dropped this
                // slot from the map while our retry was still in flight.
                // Re-register it so the connection stays reachable.
                let mapped = {
                    let map = self.connections.read().await;
                    map.get(&addr)
                        .is_some_and(|existing| Arc::ptr_eq(existing, &slot))
                };
                if !mapped {
                    let mut map = self.connections.write().await;
                    map.entry(addr).or_insert_with(|| Arc::clone(&slot));
                }
                Ok(connection)
            }
            Err(err) => {
                // Drop the empty slot so the next request subscribes fresh.
                let mut map = self.connections.write().await;
                if let Some(existing) = map.get(&addr)
                    && existing.get().is_none()
                {
                    map.remove(&addr);
                }
                Err(err)
            }
        }
    }

    /// Removes the connection for `addr` unconditionally and notifies the
    /// manager. Used exclusively when authorization fails for the address.
    pub async fn evict(&self, addr: IpAddr, reason: &str) {
        let removed = self.connections.write().await.remove(&addr);
        if let Some(slot) = removed
            && slot.get().is_some()
        {
            tracing::info!(%addr, reason, "connection evicted");
            self.manager.notify_disconnected(addr, reason).await;
        }
    }

    /// Summaries of all registered connections, for the status surface.
    pub async fn list(&self) -> Vec<ConnectionSummary> {
        let slots: Vec<ConnectionSlot> = self.connections.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(connection) = slot.get() {
                summaries.push(connection.summary().await);
            }
        }
        summaries
    }

    /// Number of registered addresses.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no address is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex as AsyncMutex;

    use crate::domain::{Credentials, WorkTemplate};
    use crate::manager::{FixedPoolConfig, FixedPoolManager, PoolSession};

    /// Delegates to a [`FixedPoolManager`] while counting and scripting
    /// failures, to observe the registry's contract from the outside.
    #[derive(Debug)]
    struct ScriptedManager {
        inner: FixedPoolManager,
        subscribe_calls: AtomicUsize,
        fail_subscribe: AtomicBool,
        fail_next_subscribe: AtomicBool,
        disconnects: AsyncMutex<Vec<(IpAddr, String)>>,
    }

    impl ScriptedManager {
        fn new() -> Self {
            Self {
                inner: FixedPoolManager::new(FixedPoolConfig {
                    pool_name: "scripted".to_string(),
                    template: WorkTemplate::new("00".repeat(128), "ff".repeat(32)),
                    password: None,
                    max_workers: 0,
                    job_bus_capacity: 16,
                }),
                subscribe_calls: AtomicUsize::new(0),
                fail_subscribe: AtomicBool::new(false),
                fail_next_subscribe: AtomicBool::new(false),
                disconnects: AsyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PoolManager for ScriptedManager {
        async fn subscribe(&self, addr: IpAddr) -> Result<Arc<dyn PoolSession>, GatewayError> {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for the concurrency tests.
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
            if self.fail_subscribe.load(Ordering::SeqCst)
                || self.fail_next_subscribe.swap(false, Ordering::SeqCst)
            {
                return Err(GatewayError::NoPoolAvailable);
            }
            self.inner.subscribe(addr).await
        }

        async fn authorize(
            &self,
            addr: IpAddr,
            credentials: &Credentials,
        ) -> Result<(), GatewayError> {
            self.inner.authorize(addr, credentials).await
        }

        async fn notify_disconnected(&self, addr: IpAddr, reason: &str) {
            self.disconnects.lock().await.push((addr, reason.to_string()));
            self.inner.notify_disconnected(addr, reason).await;
        }
    }

    fn addr(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[tokio::test]
    async fn concurrent_first_contact_subscribes_exactly_once() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = Arc::new(ConnectionRegistry::new(
            Arc::clone(&manager) as Arc<dyn PoolManager>
        ));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(
                async move { registry.get_or_create(addr(1)).await },
            ));
        }
        for task in tasks {
            let joined = task.await;
            let Ok(result) = joined else {
                panic!("task panicked");
            };
            assert!(result.is_ok());
        }

        assert_eq!(manager.subscribe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn distinct_addresses_get_distinct_connections() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = ConnectionRegistry::new(Arc::clone(&manager) as Arc<dyn PoolManager>);

        let a = registry.get_or_create(addr(1)).await;
        let b = registry.get_or_create(addr(2)).await;
        let (Ok(a), Ok(b)) = (a, b) else {
            panic!("creation failed");
        };
        assert_ne!(a.address(), b.address());
        assert_eq!(registry.len().await, 2);
        assert_eq!(manager.subscribe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_requests_reuse_the_connection() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = ConnectionRegistry::new(Arc::clone(&manager) as Arc<dyn PoolManager>);

        let first = registry.get_or_create(addr(1)).await;
        let second = registry.get_or_create(addr(1)).await;
        let (Ok(first), Ok(second)) = (first, second) else {
            panic!("creation failed");
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.subscribe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_no_entry_and_retries_fresh() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = ConnectionRegistry::new(Arc::clone(&manager) as Arc<dyn PoolManager>);

        manager.fail_subscribe.store(true, Ordering::SeqCst);
        let failed = registry.get_or_create(addr(1)).await;
        assert!(matches!(failed, Err(GatewayError::NoPoolAvailable)));
        assert!(registry.is_empty().await);

        manager.fail_subscribe.store(false, Ordering::SeqCst);
        let retried = registry.get_or_create(addr(1)).await;
        assert!(retried.is_ok());
        assert_eq!(manager.subscribe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_subscribe_overlapping_concurrent_retry_keeps_winner_registered() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = Arc::new(ConnectionRegistry::new(
            Arc::clone(&manager) as Arc<dyn PoolManager>
        ));

        // First caller's handshake fails slowly; a second caller queued on
        // the same slot retries and succeeds while the first caller's
        // cleanup runs.
        manager.fail_next_subscribe.store(true, Ordering::SeqCst);
        let loser = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.get_or_create(addr(1)).await })
        };
        tokio::time::sleep(tokio::time::Duration::from_millis(2)).await;
        let winner = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.get_or_create(addr(1)).await })
        };

        let lost = loser.await;
        let Ok(lost) = lost else {
            panic!("task panicked");
        };
        assert!(matches!(lost, Err(GatewayError::NoPoolAvailable)));

        let won = winner.await;
        let Ok(Ok(won)) = won else {
            panic!("winner failed");
        };

        // The winner's live connection is reachable through the registry.
        assert_eq!(registry.len().await, 1);
        let again = registry.get_or_create(addr(1)).await;
        let Ok(again) = again else {
            panic!("lookup failed");
        };
        assert!(Arc::ptr_eq(&won, &again));
        assert_eq!(manager.subscribe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evict_removes_entry_and_notifies_manager() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = ConnectionRegistry::new(Arc::clone(&manager) as Arc<dyn PoolManager>);

        let created = registry.get_or_create(addr(1)).await;
        assert!(created.is_ok());

        registry.evict(addr(1), "authorization failed").await;
        assert!(registry.is_empty().await);

        let disconnects = manager.disconnects.lock().await;
        assert_eq!(
            disconnects.as_slice(),
            &[(addr(1), "authorization failed".to_string())]
        );
        drop(disconnects);

        // Next contact re-enters the subscribe flow.
        let recreated = registry.get_or_create(addr(1)).await;
        assert!(recreated.is_ok());
        assert_eq!(manager.subscribe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evict_of_unknown_address_is_a_no_op() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = ConnectionRegistry::new(Arc::clone(&manager) as Arc<dyn PoolManager>);

        registry.evict(addr(9), "authorization failed").await;
        assert!(manager.disconnects.lock().await.is_empty());
    }

    #[tokio::test]
    async fn list_reports_registered_connections() {
        let manager = Arc::new(ScriptedManager::new());
        let registry = ConnectionRegistry::new(Arc::clone(&manager) as Arc<dyn PoolManager>);

        let created = registry.get_or_create(addr(1)).await;
        assert!(created.is_ok());

        let summaries = registry.list().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries.first().map(|s| s.address),
            Some(addr(1))
        );
    }
}
