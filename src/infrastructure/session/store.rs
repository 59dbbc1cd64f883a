//! Session records in the backing store

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::identity::{token_org, KeyIdentity};
use crate::domain::session::SessionState;
use crate::domain::storage::{KeyValueStore, KeyValueStoreExt};
use crate::domain::DomainError;
use crate::infrastructure::logging::obfuscate_key;

/// Namespace of key sessions
pub const SESSION_PREFIX: &str = "apikey-";
/// Namespace of org-level sessions
pub const ORG_SESSION_PREFIX: &str = "orgkey.";
/// Quota counters live beside the sessions they count
pub const QUOTA_KEY_PREFIX: &str = "quota-";
/// Rate limiter state written by the data plane
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate-limit-";

/// CRUD over sessions with hashed or plain addressing
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    identity: KeyIdentity,
    prefix: String,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, identity: KeyIdentity) -> Self {
        Self::with_prefix(store, identity, SESSION_PREFIX)
    }

    /// Org sessions are keyed by org ID, never hashed
    pub fn for_orgs(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_prefix(store, KeyIdentity::plain(), ORG_SESSION_PREFIX)
    }

    pub fn with_prefix(
        store: Arc<dyn KeyValueStore>,
        identity: KeyIdentity,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            prefix: prefix.into(),
        }
    }

    pub fn identity(&self) -> &KeyIdentity {
        &self.identity
    }

    pub fn backing_store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Address of `key` under the current hashing rules
    pub fn address(&self, key: &str, is_hashed: bool) -> String {
        if is_hashed {
            key.to_string()
        } else {
            self.identity.hash_key(key)
        }
    }

    fn storage_key(&self, address: &str) -> String {
        format!("{}{}", self.prefix, address)
    }

    /// Names a plain key may be stored under for `org_id`
    fn candidate_names(&self, org_id: &str, key: &str) -> Vec<String> {
        if org_id.is_empty() || token_org(key).as_deref() == Some(org_id) {
            return vec![key.to_string()];
        }

        // Custom keys are stored in the org-qualified format
        let qualified = self.identity.generate_token(org_id, key);
        if qualified == key {
            vec![key.to_string()]
        } else {
            vec![qualified, key.to_string()]
        }
    }

    /// Every storage address `key` may live under, in lookup order
    fn lookup_addresses(&self, org_id: &str, key: &str) -> Vec<(String, String)> {
        let names = self.candidate_names(org_id, key);
        let mut addresses = Vec::new();

        for strategy in self.identity.strategies() {
            for name in &names {
                let address = self.identity.resolve(strategy, name);
                if !addresses.iter().any(|(_, a)| a == &address) {
                    addresses.push((name.clone(), address));
                }
            }
        }

        addresses
    }

    /// Fetch a session; `key_id` on the result is the name it was found by,
    /// or the hash itself for hashed lookups
    pub async fn get(
        &self,
        org_id: &str,
        key: &str,
        by_hash: bool,
    ) -> Result<Option<SessionState>, DomainError> {
        if by_hash {
            let session: Option<SessionState> = self.store.get_json(&self.storage_key(key)).await?;
            return Ok(session.map(|mut session| {
                session.key_id = key.to_string();
                session
            }));
        }

        for (name, address) in self.lookup_addresses(org_id, key) {
            let session: Option<SessionState> =
                self.store.get_json(&self.storage_key(&address)).await?;

            if let Some(mut session) = session {
                session.key_id = name;
                return Ok(Some(session));
            }
        }

        debug!(key = %obfuscate_key(key), "Session not found");
        Ok(None)
    }

    pub async fn exists(&self, org_id: &str, key: &str, by_hash: bool) -> Result<bool, DomainError> {
        Ok(self.get(org_id, key, by_hash).await?.is_some())
    }

    pub async fn set(
        &self,
        key: &str,
        session: &SessionState,
        ttl: Option<Duration>,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        let address = self.address(key, is_hashed);
        let mut stored = session.for_storage();
        stored.key_id.clear();

        self.store
            .set_json(&self.storage_key(&address), &stored, ttl)
            .await
    }

    /// Remove a session from every address it may be stored under
    pub async fn delete(&self, org_id: &str, key: &str, is_hashed: bool) -> Result<bool, DomainError> {
        if is_hashed {
            return self.store.delete(&self.storage_key(key)).await;
        }

        let keys: Vec<String> = self
            .lookup_addresses(org_id, key)
            .into_iter()
            .map(|(_, address)| self.storage_key(&address))
            .collect();

        Ok(self.store.delete_many(&keys).await? > 0)
    }

    /// Session names (or hashes) starting with `filter`, taken literally;
    /// bookkeeping counters sharing the namespace are left out
    pub async fn list(&self, filter: &str) -> Result<Vec<String>, DomainError> {
        let pattern = format!("{}{}*", self.prefix, filter);
        let keys = self.store.keys(&pattern).await?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.prefix.as_str()).map(str::to_string))
            // `*` in the filter would otherwise widen the store's glob
            .filter(|k| k.starts_with(filter))
            .filter(|k| !k.starts_with(QUOTA_KEY_PREFIX) && !k.starts_with(RATE_LIMIT_KEY_PREFIX))
            .collect())
    }
}
