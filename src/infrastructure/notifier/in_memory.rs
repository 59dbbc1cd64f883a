//! Process-local notification bus

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;

use crate::domain::notification::{Notification, NotificationBus, NotificationStream};
use crate::domain::DomainError;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast-channel bus; every subscriber sees every notification
///
/// Notifications go through their JSON encoding so the in-process path
/// behaves like the networked one.
#[derive(Debug, Clone)]
pub struct InMemoryBus {
    sender: broadcast::Sender<String>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Push a raw message, bypassing encoding
    pub fn publish_raw(&self, raw: impl Into<String>) {
        // No subscribers is not an error for a fire-and-forget bus
        let _ = self.sender.send(raw.into());
    }
}

#[async_trait]
impl NotificationBus for InMemoryBus {
    async fn publish(&self, notification: Notification) -> Result<(), DomainError> {
        self.publish_raw(notification.encode()?);
        Ok(())
    }

    async fn subscribe(&self) -> Result<NotificationStream, DomainError> {
        let stream = BroadcastStream::new(self.sender.subscribe()).filter_map(|item| async move {
            match item {
                Ok(raw) => match Notification::decode(&raw) {
                    Ok(notification) => Some(notification),
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable notification");
                        None
                    }
                },
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification subscriber lagged");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }
}
