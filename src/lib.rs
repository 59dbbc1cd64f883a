//! PMP Gateway Control
//!
//! Control plane for an API gateway fleet:
//! - Key sessions with quotas, policies and hashed key storage
//! - Org sessions and OAuth client registration
//! - API and policy definitions on disk with fleet-wide reloads
//! - An admin HTTP API guarded by a shared secret

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::state::AppState;
use config::StorageBackend;
use domain::{KeyValueStore, NotificationBus};
use infrastructure::kv::{InMemoryStore, RedisStore, RedisStoreConfig};
use infrastructure::notifier::{InMemoryBus, RedisBus};

/// Connect the configured store and bus, wire the services and load the
/// definitions found on disk
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let (store, bus): (Arc<dyn KeyValueStore>, Arc<dyn NotificationBus>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory store and notification bus");
                (Arc::new(InMemoryStore::new()), Arc::new(InMemoryBus::new()))
            }
            StorageBackend::Redis => {
                info!(url = %config.storage.redis_url, "Connecting to Redis");
                let store = RedisStore::new(
                    RedisStoreConfig::new(config.storage.redis_url.as_str())
                        .with_key_prefix(config.storage.key_prefix.as_str()),
                )
                .await?;
                let bus = RedisBus::new(
                    &config.storage.redis_url,
                    config.gateway.notification_channel.as_str(),
                )
                .await?;
                (Arc::new(store), Arc::new(bus))
            }
        };

    let node_id = if config.gateway.node_id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        config.gateway.node_id.clone()
    };
    info!(node_id = %node_id, "Node identity");

    let state = AppState::build(&config.gateway, store, bus, &node_id)?;

    if let Err(e) = state.reload.reload_blocking().await {
        warn!(error = %e, "Initial definition load failed");
    }

    Ok(state)
}
