//! Shared services handed to every admin handler

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::{DomainError, KeyValueStore, NotificationBus};
use crate::infrastructure::oauth::OAuthClientRegistry;
use crate::infrastructure::registry::{ConfigRegistry, DefinitionStore, ReloadCoordinator, WriteMode};
use crate::infrastructure::session::{
    KeyGenerator, KeyIdentity, KeyLifecycle, KeyLifecycleSettings, OrgSessionService,
    RandomKeyGenerator, SessionStore,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub admin_secret: Arc<str>,
    pub store: Arc<dyn KeyValueStore>,
    pub registry: Arc<ConfigRegistry>,
    pub reload: ReloadCoordinator,
    pub definitions: Arc<DefinitionStore>,
    pub keys: Arc<KeyLifecycle>,
    pub orgs: Arc<OrgSessionService>,
    pub oauth: Arc<OAuthClientRegistry>,
    pub bus: Arc<dyn NotificationBus>,
}

impl AppState {
    /// Wire services over an already connected store and bus
    ///
    /// The registry starts empty; callers load definitions through `reload`.
    pub fn build(
        gateway: &GatewayConfig,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn NotificationBus>,
        node_id: &str,
    ) -> Result<Self, DomainError> {
        Self::assemble(gateway, store, bus, node_id, |identity| {
            Arc::new(RandomKeyGenerator::new(identity))
        })
    }

    fn assemble(
        gateway: &GatewayConfig,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn NotificationBus>,
        node_id: &str,
        generator: impl FnOnce(KeyIdentity) -> Arc<dyn KeyGenerator>,
    ) -> Result<Self, DomainError> {
        let identity = KeyIdentity::new(
            gateway.hash_keys,
            gateway.hash_function()?,
            gateway.legacy_hash_function()?,
        );
        let generator = generator(identity.clone());

        let write_mode = if gateway.harden_definition_writes {
            WriteMode::TempThenRename
        } else {
            WriteMode::DeleteThenWrite
        };
        let definitions = Arc::new(
            DefinitionStore::new(gateway.app_path.as_str(), gateway.policy_path.as_str())
                .with_write_mode(write_mode),
        );

        let registry = Arc::new(ConfigRegistry::new());
        let reload = ReloadCoordinator::new(
            registry.clone(),
            definitions.clone(),
            bus.clone(),
            node_id,
        );

        let keys = KeyLifecycle::new(
            SessionStore::new(store.clone(), identity.clone()),
            registry.clone(),
        )
        .with_generator(generator.clone())
        .with_settings(KeyLifecycleSettings {
            allow_master_keys: gateway.allow_master_keys,
            enable_hashed_keys_listing: gateway.enable_hashed_keys_listing,
        });

        let orgs = OrgSessionService::new(store.clone(), identity, registry.clone())
            .with_suppressed_default_store(gateway.suppress_default_org_store);

        let oauth = OAuthClientRegistry::new(
            store.clone(),
            registry.clone(),
            generator,
            bus.clone(),
            node_id,
        );

        Ok(Self {
            admin_secret: Arc::from(gateway.secret.as_str()),
            store,
            registry,
            reload,
            definitions,
            keys: Arc::new(keys),
            orgs: Arc::new(orgs),
            oauth: Arc::new(oauth),
            bus,
        })
    }
}
