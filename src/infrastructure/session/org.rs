//! Org-level sessions
//!
//! One session per organisation, named after the org ID and kept apart from
//! key sessions under the org namespace. Its quota counter lives in the
//! shared quota namespace.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::identity::KeyIdentity;
use super::quota::QuotaLedger;
use super::store::SessionStore;
use crate::domain::session::{KeyAction, KeyChange, SessionState};
use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;
use crate::infrastructure::registry::ConfigRegistry;

#[derive(Debug, Clone)]
pub struct OrgSessionService {
    sessions: SessionStore,
    quota: QuotaLedger,
    registry: Arc<ConfigRegistry>,
    suppress_default_store: bool,
}

impl OrgSessionService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        identity: KeyIdentity,
        registry: Arc<ConfigRegistry>,
    ) -> Self {
        Self {
            sessions: SessionStore::for_orgs(store.clone()),
            quota: QuotaLedger::new(store, identity, ""),
            registry,
            suppress_default_store: false,
        }
    }

    /// Refuse org sessions for orgs no loaded API belongs to
    pub fn with_suppressed_default_store(mut self, suppress: bool) -> Self {
        self.suppress_default_store = suppress;
        self
    }

    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    pub async fn add_or_update(
        &self,
        org_id: &str,
        mut session: SessionState,
        is_create: bool,
        reset_quota: bool,
    ) -> Result<KeyChange, DomainError> {
        if !self.registry.org_has_apis(org_id) {
            warn!(org_id = %org_id, "Couldn't find org session store in active API list");
            if self.suppress_default_store {
                return Err(DomainError::not_found(
                    "No such organisation found in Active API list",
                ));
            }
        }

        if reset_quota {
            self.quota.reset_quota(org_id, &mut session, false).await?;
        }

        self.sessions
            .set(org_id, &session, None, false)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Error writing to key store {}", e.message()))
            })?;

        info!(org_id = %org_id, status = "ok", "New organization key added or updated");

        let action = if is_create {
            KeyAction::Added
        } else {
            KeyAction::Modified
        };
        Ok(KeyChange::new(org_id, action))
    }

    pub async fn get(&self, org_id: &str) -> Result<SessionState, DomainError> {
        if self.registry.spec_for_org(org_id).is_none() {
            return Err(DomainError::not_found("Org not found"));
        }

        let session = self.sessions.get("", org_id, false).await?.ok_or_else(|| {
            error!(org_id = %org_id, status = "fail", "Failed retrieval of record for ORG ID");
            DomainError::not_found("Org not found")
        })?;

        info!(org_id = %org_id, status = "ok", "Retrieved record for ORG ID");
        Ok(session)
    }

    pub async fn list(&self, filter: &str) -> Result<Vec<String>, DomainError> {
        if self.registry.spec_for_org("").is_none() {
            return Err(DomainError::not_found("ORG not found"));
        }

        self.sessions.list(filter).await
    }

    pub async fn delete(&self, org_id: &str) -> Result<KeyChange, DomainError> {
        if self.registry.spec_for_org(org_id).is_none() {
            error!(org_id = %org_id, status = "fail", "Failed to delete org key");
            return Err(DomainError::not_found("Org not found"));
        }

        if !self.sessions.delete("", org_id, false).await? {
            return Err(DomainError::validation("Failed to remove the key"));
        }

        info!(org_id = %org_id, status = "ok", "Org key deleted");
        Ok(KeyChange::new(org_id, KeyAction::Deleted))
    }
}
