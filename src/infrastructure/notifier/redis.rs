//! Redis pub/sub notification bus

use std::fmt;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, warn};

use crate::domain::notification::{Notification, NotificationBus, NotificationStream};
use crate::domain::DomainError;

pub const DEFAULT_CHANNEL: &str = "gateway.cluster.notifications";

/// Bus shared by every node pointed at the same Redis and channel
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    connection: ConnectionManager,
    channel: String,
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus")
            .field("channel", &self.channel)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisBus {
    pub async fn new(url: &str, channel: impl Into<String>) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            client,
            connection,
            channel: channel.into(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl NotificationBus for RedisBus {
    async fn publish(&self, notification: Notification) -> Result<(), DomainError> {
        let payload = notification.encode()?;
        let mut conn = self.connection.clone();

        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to publish notification: {}", e)))?;

        debug!(
            channel = %self.channel,
            command = ?notification.command,
            receivers,
            "Notification published"
        );
        Ok(())
    }

    async fn subscribe(&self) -> Result<NotificationStream, DomainError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to open pub/sub connection: {}", e)))?;

        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to subscribe: {}", e)))?;

        let stream = pubsub.into_on_message().filter_map(|message| async move {
            let raw: String = match message.get_payload() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Dropping non-text notification");
                    return None;
                }
            };

            match Notification::decode(&raw) {
                Ok(notification) => Some(notification),
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable notification");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }
}
