//! Fleet notification domain
//!
//! Notifications are signals, not data: receivers re-derive state from
//! persisted definitions instead of trusting payloads.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Commands understood by every node on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationCommand {
    #[serde(rename = "GroupReload")]
    GroupReload,
    #[serde(rename = "KeySpaceUpdated")]
    KeySpaceUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub command: NotificationCommand,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub source_node: String,
}

impl Notification {
    pub fn group_reload(source_node: impl Into<String>) -> Self {
        Self {
            command: NotificationCommand::GroupReload,
            payload: String::new(),
            source_node: source_node.into(),
        }
    }

    /// Tokens or keys that were revoked, comma-joined
    pub fn key_space_updated(keys: &[String], source_node: impl Into<String>) -> Self {
        Self {
            command: NotificationCommand::KeySpaceUpdated,
            payload: keys.join(","),
            source_node: source_node.into(),
        }
    }

    pub fn encode(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::encoding(format!("Failed to encode notification: {}", e)))
    }

    pub fn decode(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw)
            .map_err(|e| DomainError::encoding(format!("Malformed notification: {}", e)))
    }
}

pub type NotificationStream = BoxStream<'static, Notification>;

/// Publish/subscribe channel shared by the fleet
///
/// Delivery is at-least-once with no ordering across nodes; a publisher
/// also receives its own notifications.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationBus: Send + Sync {
    async fn publish(&self, notification: Notification) -> Result<(), DomainError>;

    /// Undecodable messages are dropped by the implementation, never yielded
    async fn subscribe(&self) -> Result<NotificationStream, DomainError>;
}
