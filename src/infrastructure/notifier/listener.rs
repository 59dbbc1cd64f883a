//! Consumes fleet notifications and reacts locally

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, Notification, NotificationBus, NotificationCommand, NotificationStream};
use crate::infrastructure::registry::ReloadCoordinator;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(500);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

pub struct NotificationListener {
    bus: Arc<dyn NotificationBus>,
    reload: ReloadCoordinator,
    reconnect_delay: Duration,
}

impl NotificationListener {
    pub fn new(bus: Arc<dyn NotificationBus>, reload: ReloadCoordinator) -> Self {
        Self {
            bus,
            reload,
            reconnect_delay: INITIAL_RECONNECT_DELAY,
        }
    }

    /// First wait before resubscribing; doubles per failed attempt
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// React to one notification
    ///
    /// A group reload always re-reads persisted definitions, which makes
    /// duplicate or reordered signals harmless.
    pub fn handle(&self, notification: &Notification) {
        match notification.command {
            NotificationCommand::GroupReload => {
                info!(source_node = %notification.source_node, "Group reload received");
                self.reload.reload(None);
            }
            NotificationCommand::KeySpaceUpdated => {
                let count = notification
                    .payload
                    .split(',')
                    .filter(|key| !key.is_empty())
                    .count();
                info!(
                    source_node = %notification.source_node,
                    keys = count,
                    "Key space updated"
                );
            }
        }
    }

    async fn consume(&self, mut stream: NotificationStream) {
        while let Some(notification) = stream.next().await {
            debug!(command = ?notification.command, "Notification received");
            self.handle(&notification);
        }
    }

    /// Subscribe again after the stream ended, backing off between failures
    async fn resubscribe(&self) -> NotificationStream {
        let mut delay = self.reconnect_delay;
        let mut attempt: u32 = 0;

        loop {
            tokio::time::sleep(delay).await;
            attempt += 1;

            match self.bus.subscribe().await {
                Ok(stream) => {
                    info!(attempt, "Notification listener reconnected");
                    return stream;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Notification listener reconnect failed");
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }
        }
    }

    async fn run(self, mut stream: NotificationStream) {
        loop {
            self.consume(stream).await;
            warn!("Notification stream closed, reconnecting");

            stream = self.resubscribe().await;

            // Signals sent while disconnected are lost
            self.reload.reload(None);
        }
    }

    /// Subscribe, then process notifications on a background task
    ///
    /// Only the first subscription can fail; later disconnects are retried
    /// until the task is aborted.
    pub async fn start(self) -> Result<JoinHandle<()>, DomainError> {
        let stream = self.bus.subscribe().await?;
        info!("Notification listener started");

        Ok(tokio::spawn(self.run(stream)))
    }
}
