//! Serialized, coalescing reloads of the config registry

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::config_registry::ConfigRegistry;
use crate::domain::{ApiDefinition, DomainError, Notification, NotificationBus, Policy};

/// Where a reload reads definitions from
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn load_apis(&self) -> Result<Vec<ApiDefinition>, DomainError>;

    async fn load_policies(&self) -> Result<Vec<Policy>, DomainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Queued,
    Swapping,
}

/// Run once the reload a caller asked for has finished
pub type ReloadCallback = Box<dyn FnOnce() + Send + 'static>;

enum Waiter {
    Callback(ReloadCallback),
    Signal(oneshot::Sender<Result<(), DomainError>>),
}

impl Waiter {
    fn complete(self, outcome: &Result<(), DomainError>) {
        match self {
            Self::Callback(callback) => callback(),
            Self::Signal(sender) => {
                // The caller may have gone away; nothing to tell then
                let _ = sender.send(outcome.clone());
            }
        }
    }
}

#[derive(Default)]
struct Queue {
    requested: bool,
    waiters: Vec<Waiter>,
    worker_active: bool,
    swapping: bool,
}

/// Drives `Idle -> Queued -> Swapping -> Idle`
///
/// A single worker task performs swaps one at a time. Every request that
/// arrives while a swap is running is folded into the next one, so a burst
/// of reloads costs at most two swaps.
#[derive(Clone)]
pub struct ReloadCoordinator {
    registry: Arc<ConfigRegistry>,
    source: Arc<dyn DefinitionSource>,
    bus: Arc<dyn NotificationBus>,
    node_id: String,
    queue: Arc<Mutex<Queue>>,
}

impl fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("node_id", &self.node_id)
            .field("state", &self.state())
            .finish()
    }
}

impl ReloadCoordinator {
    pub fn new(
        registry: Arc<ConfigRegistry>,
        source: Arc<dyn DefinitionSource>,
        bus: Arc<dyn NotificationBus>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            source,
            bus,
            node_id: node_id.into(),
            queue: Arc::new(Mutex::new(Queue::default())),
        }
    }

    pub fn registry(&self) -> Arc<ConfigRegistry> {
        self.registry.clone()
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ReloadState {
        let queue = self.lock();

        if queue.swapping {
            ReloadState::Swapping
        } else if queue.requested {
            ReloadState::Queued
        } else {
            ReloadState::Idle
        }
    }

    fn enqueue(&self, waiter: Option<Waiter>) {
        let start_worker = {
            let mut queue = self.lock();
            queue.requested = true;
            queue.waiters.extend(waiter);

            if queue.worker_active {
                false
            } else {
                queue.worker_active = true;
                true
            }
        };

        if start_worker {
            let worker = self.clone();
            tokio::spawn(async move { worker.run().await });
        }
    }

    /// Queue a reload; `callback` runs once it completes
    pub fn reload(&self, callback: Option<ReloadCallback>) {
        debug!("Reload queued");
        self.enqueue(callback.map(Waiter::Callback));
    }

    /// Queue a reload and wait for the swap; cannot be cancelled
    pub async fn reload_blocking(&self) -> Result<(), DomainError> {
        let (sender, receiver) = oneshot::channel();
        self.enqueue(Some(Waiter::Signal(sender)));

        receiver
            .await
            .map_err(|_| DomainError::internal("Reload worker stopped before completing"))?
    }

    /// Ask every node on the bus, this one included, to reload
    pub async fn group_reload(&self) -> Result<(), DomainError> {
        self.bus
            .publish(Notification::group_reload(self.node_id.clone()))
            .await?;
        info!(node_id = %self.node_id, "Group reload signalled");
        Ok(())
    }

    async fn run(&self) {
        loop {
            let waiters = {
                let mut queue = self.lock();
                if !queue.requested {
                    queue.worker_active = false;
                    return;
                }
                queue.requested = false;
                queue.swapping = true;
                std::mem::take(&mut queue.waiters)
            };

            let outcome = self.swap().await;
            if let Err(e) = &outcome {
                error!(error = %e, "Reload failed, keeping previous registry snapshot");
            }

            self.lock().swapping = false;

            for waiter in waiters {
                waiter.complete(&outcome);
            }
        }
    }

    async fn swap(&self) -> Result<(), DomainError> {
        let apis = self.source.load_apis().await?;
        let policies = self.source.load_policies().await?;

        self.registry.replace(apis, policies);
        info!("Reload URL structure - success");
        Ok(())
    }
}
