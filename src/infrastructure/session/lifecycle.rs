//! Key lifecycle: create, update, read, list and delete sessions
//!
//! All writes for one key go through the same sequence: policies are
//! merged, quotas are reset unless the caller asked to keep the running
//! window, and the session is saved once per API it grants access to.
//! A failure part way through a multi-API write leaves the APIs already
//! processed as they are.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use super::certificates::{CertificateStore, KvCertificateStore};
use super::generator::{KeyGenerator, RandomKeyGenerator};
use super::identity::{token_org, token_org_prefix, KeyIdentity};
use super::password::{hash_basic_auth_password, Argon2Hasher, PasswordHasher};
use super::quota::QuotaLedger;
use super::store::SessionStore;
use crate::domain::session::{KeyAction, KeyChange, KeyRequestContext, SessionState};
use crate::domain::{ApiDefinition, DomainError};
use crate::infrastructure::logging::obfuscate_key;
use crate::infrastructure::policy::{reset_api_limits, PolicyApplier};
use crate::infrastructure::registry::ConfigRegistry;

/// Deletes scoped to this API ID remove the key from every API
pub const ALL_APIS: &str = "-1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyLifecycleSettings {
    /// Keys without access rights are granted every API
    pub allow_master_keys: bool,
    /// Permit listing keys while keys are stored hashed
    pub enable_hashed_keys_listing: bool,
}

#[derive(Debug, Clone)]
pub struct KeyLifecycle {
    sessions: SessionStore,
    quota: QuotaLedger,
    applier: PolicyApplier,
    registry: Arc<ConfigRegistry>,
    generator: Arc<dyn KeyGenerator>,
    hasher: Arc<dyn PasswordHasher>,
    certificates: Arc<dyn CertificateStore>,
    settings: KeyLifecycleSettings,
}

impl KeyLifecycle {
    pub fn new(sessions: SessionStore, registry: Arc<ConfigRegistry>) -> Self {
        let identity = sessions.identity().clone();
        let store = sessions.backing_store();

        Self {
            quota: QuotaLedger::new(store.clone(), identity.clone(), sessions.prefix()),
            applier: PolicyApplier::new(registry.clone()),
            generator: Arc::new(RandomKeyGenerator::new(identity)),
            hasher: Arc::new(Argon2Hasher::new()),
            certificates: Arc::new(KvCertificateStore::new(store)),
            settings: KeyLifecycleSettings::default(),
            sessions,
            registry,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_certificates(mut self, certificates: Arc<dyn CertificateStore>) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn with_settings(mut self, settings: KeyLifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn identity(&self) -> &KeyIdentity {
        self.sessions.identity()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    pub fn applier(&self) -> &PolicyApplier {
        &self.applier
    }

    pub fn generator(&self) -> Arc<dyn KeyGenerator> {
        self.generator.clone()
    }

    /// Create or update the session stored under `key_name`
    pub async fn add_or_update(
        &self,
        key_name: &str,
        mut session: SessionState,
        ctx: &KeyRequestContext,
    ) -> Result<KeyChange, DomainError> {
        let now = Utc::now();
        self.applier.apply(&mut session)?;

        let mut original: Option<SessionState> = None;
        let key_name = if ctx.is_update() {
            let existing = self
                .sessions
                .get(&session.org_id, key_name, ctx.hashed)
                .await?
                .ok_or_else(|| {
                    warn!(key = %obfuscate_key(key_name), "Could not find key when updating");
                    DomainError::not_found("Key is not found")
                })?;

            self.check_certificate_change(&existing, &session).await?;
            session.date_created = existing.date_created;

            if ctx.suppress_reset {
                carry_forward_windows(&existing, &mut session);
            }

            let resolved = existing.key_id.clone();
            original = Some(existing);
            resolved
        } else {
            session.date_created = now;
            self.identity().generate_token(&session.org_id, key_name)
        };

        // A stale expiry in the payload must not lock the key out for good
        if session.expires > 1 && session.expires < now.timestamp() {
            session.expires = original.as_ref().map(|o| o.expires).unwrap_or(0);
        }

        let original_auth = original
            .as_ref()
            .map(|o| o.basic_auth_data.clone())
            .unwrap_or_default();
        if !session.basic_auth_data.password.is_empty() {
            // The stored value is a hash, so on update this differs for any
            // password the caller sends in plaintext
            if !ctx.is_update() || original_auth.password != session.basic_auth_data.password {
                hash_basic_auth_password(self.hasher.as_ref(), &mut session.basic_auth_data);
            }
        } else if !original_auth.password.is_empty() {
            session.basic_auth_data = original_auth;
        }

        self.do_add_or_update(&key_name, &mut session, ctx.suppress_reset, ctx.hashed)
            .await
            .map_err(|e| {
                error!(key = %obfuscate_key(&key_name), error = %e, "Failed to write key");
                match e {
                    DomainError::Storage { .. }
                    | DomainError::Encoding { .. }
                    | DomainError::Internal { .. } => DomainError::storage(
                        "Failed to create key, ensure security settings are correct.",
                    ),
                    other => other,
                }
            })?;

        let mut change = if ctx.is_update() {
            KeyChange::new(key_name.clone(), KeyAction::Modified)
        } else {
            KeyChange::new(key_name.clone(), KeyAction::Added)
        };

        if self.identity().hashes_keys() && !ctx.is_update() {
            let key_hash = if ctx.hashed {
                key_name.clone()
            } else {
                self.identity().hash_key(&key_name)
            };
            change = change.with_hash(key_hash);
        }

        Ok(change)
    }

    async fn check_certificate_change(
        &self,
        existing: &SessionState,
        incoming: &SessionState,
    ) -> Result<(), DomainError> {
        if incoming.certificate == existing.certificate {
            return Ok(());
        }

        if incoming.certificate.is_empty() {
            error!("Key must contain a certificate");
            return Err(DomainError::precondition(
                "Key cannot be used without a certificate",
            ));
        }

        if !self.certificates.exists(&incoming.certificate).await? {
            error!("Key must contain an existing certificate");
            return Err(DomainError::precondition(
                "Key must be used with an existent certificate",
            ));
        }

        Ok(())
    }

    async fn apply_trial_period(
        &self,
        key: &str,
        session: &mut SessionState,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        if let Some(seconds) = self.applier.trial_period(session) {
            if !self.sessions.exists(&session.org_id, key, is_hashed).await? {
                session.expires = Utc::now().timestamp() + seconds;
            }
        }
        Ok(())
    }

    async fn apply_policies_and_save(
        &self,
        key: &str,
        session: &mut SessionState,
        api: &ApiDefinition,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        self.applier.apply(session)?;

        let lifetime = (api.session_lifetime > 0)
            .then(|| Duration::from_secs(api.session_lifetime as u64));
        self.sessions.set(key, session, lifetime, is_hashed).await
    }

    async fn do_add_or_update(
        &self,
        key: &str,
        session: &mut SessionState,
        dont_reset: bool,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        // The in-memory rate limiter starts a new window when this changes
        if !dont_reset {
            session.touch(Utc::now().timestamp());
        }

        let mut saved = false;

        if !session.access_rights.is_empty() {
            reset_api_limits(&mut session.access_rights);

            let api_ids: Vec<String> = session.access_rights.keys().cloned().collect();
            for api_id in api_ids {
                let api = self.registry.api(&api_id).ok_or_else(|| {
                    error!(
                        key = %obfuscate_key(key),
                        org_id = %session.org_id,
                        api_id = %api_id,
                        "Could not add key for this API ID, API doesn't exist"
                    );
                    DomainError::precondition("API must be active to add keys")
                })?;

                self.apply_trial_period(key, session, is_hashed).await?;

                if !api.dont_set_quotas_on_create {
                    if !dont_reset {
                        self.quota.reset_quota(key, session, is_hashed).await?;
                    }
                    self.apply_policies_and_save(key, session, &api, is_hashed).await?;
                    saved = true;
                }
            }
        } else {
            if !self.settings.allow_master_keys {
                error!("Master keys disallowed in configuration, key not added");
                return Err(DomainError::precondition("Master keys not allowed"));
            }

            warn!(org_id = %session.org_id, "No API access rights set, adding key to all APIs");
            for api in self.registry.apis() {
                if !dont_reset {
                    self.quota.reset_quota(key, session, is_hashed).await?;
                }
                self.apply_trial_period(key, session, is_hashed).await?;
                self.apply_policies_and_save(key, session, &api, is_hashed).await?;
                saved = true;
            }
        }

        // Every listed API opted out of quotas on create: store the key
        // anyway, as generated keys are, only without a quota reset
        if !saved {
            self.applier.apply(session)?;
            self.sessions.set(key, session, None, is_hashed).await?;
        }

        info!(
            key = %obfuscate_key(key),
            expires = session.expires,
            org_id = %session.org_id,
            "Key added or updated"
        );
        Ok(())
    }

    /// Issue a key with a generated name
    ///
    /// Certificate-bound keys are named after their certificate, so a second
    /// key for the same certificate is refused.
    pub async fn create_generated(&self, mut session: SessionState) -> Result<KeyChange, DomainError> {
        let mut key = self.generator.generate_auth_key(&session.org_id);

        if session.hmac_enabled {
            session.hmac_string = self.generator.generate_hmac_secret();
        }

        if !session.certificate.is_empty() {
            key = self
                .identity()
                .generate_token(&session.org_id, &session.certificate);

            if self.sessions.exists(&session.org_id, &key, false).await? {
                warn!(key = %obfuscate_key(&key), "Key with given certificate already exists");
                return Err(DomainError::conflict(format!(
                    "Failed to create key - Key with given certificate already found:{}",
                    key
                )));
            }
        }

        let now = Utc::now();
        session.touch(now.timestamp());
        session.date_created = now;

        if !session.basic_auth_data.password.is_empty() {
            hash_basic_auth_password(self.hasher.as_ref(), &mut session.basic_auth_data);
        }

        self.applier.apply(&mut session)?;

        if !session.access_rights.is_empty() {
            reset_api_limits(&mut session.access_rights);

            let api_ids: Vec<String> = session.access_rights.keys().cloned().collect();
            for api_id in api_ids {
                match self.registry.api(&api_id) {
                    Some(api) => {
                        self.apply_trial_period(&key, &mut session, false).await?;
                        if !api.dont_set_quotas_on_create {
                            self.quota.reset_quota(&key, &mut session, false).await?;
                        }
                        self.apply_policies_and_save(&key, &mut session, &api, false)
                            .await
                            .map_err(creation_error)?;
                    }
                    None => {
                        self.quota.reset_quota(&key, &mut session, false).await?;
                        self.sessions
                            .set(&key, &session, None, false)
                            .await
                            .map_err(creation_error)?;
                    }
                }
            }
        } else if self.settings.allow_master_keys {
            warn!(org_id = %session.org_id, "No API access rights set on key session, adding key to all APIs");

            for api in self.registry.apis() {
                self.apply_trial_period(&key, &mut session, false).await?;
                if !api.dont_set_quotas_on_create {
                    self.quota.reset_quota(&key, &mut session, false).await?;
                }
                self.apply_policies_and_save(&key, &mut session, &api, false)
                    .await
                    .map_err(creation_error)?;
            }
        } else {
            error!(org_id = %session.org_id, "Master keys disallowed in configuration, key not added");
            return Err(DomainError::validation(
                "Failed to create key, keys must have at least one Access Rights record set.",
            ));
        }

        let mut change = KeyChange::new(key.clone(), KeyAction::Added);
        if self.identity().hashes_keys() {
            change = change.with_hash(self.identity().hash_key(&key));
        }

        info!(key = %obfuscate_key(&key), org_id = %session.org_id, "Generated new key");
        Ok(change)
    }

    /// The session a payload would produce, without saving anything
    pub fn preview(&self, mut session: SessionState) -> Result<SessionState, DomainError> {
        let now = Utc::now();
        session.touch(now.timestamp());
        session.date_created = now;

        self.applier.apply(&mut session)?;
        Ok(session)
    }

    /// A session with its remaining quotas filled in
    pub async fn get_detail(
        &self,
        key: &str,
        api_id: &str,
        org_id: &str,
        by_hash: bool,
    ) -> Result<SessionState, DomainError> {
        if by_hash && !self.identity().hashes_keys() {
            return Err(DomainError::validation(
                "Key requested by hash but key hashing is not enabled",
            ));
        }

        let org_id = self
            .registry
            .api(api_id)
            .map(|api| api.org_id.clone())
            .unwrap_or_else(|| org_id.to_string());

        let mut session = self
            .sessions
            .get(&org_id, key, by_hash)
            .await?
            .ok_or_else(|| DomainError::not_found("Key not found"))?;
        let key = session.key_id.clone();

        if let Err(e) = self.applier.apply(&mut session) {
            warn!(key = %obfuscate_key(&key), error = %e, "Could not apply policies to key detail");
        }

        self.quota
            .populate_remaining(&key, &mut session, by_hash)
            .await?;

        info!(key = %obfuscate_key(&key), status = "ok", "Retrieved key detail");
        Ok(session)
    }

    /// Key names starting with `filter`, plus new-format keys of the org
    /// named by `filter`
    pub async fn list(&self, filter: &str) -> Result<Vec<String>, DomainError> {
        if self.identity().hashes_keys() {
            if !self.settings.enable_hashed_keys_listing {
                return Err(DomainError::not_found(
                    "Hashed key listing is disabled in config (enable_hashed_keys_listing)",
                ));
            }
            return self.sessions.list("").await;
        }

        let mut keys = self.sessions.list(filter).await?;
        if !filter.is_empty() {
            for key in self.sessions.list(&token_org_prefix(filter)).await? {
                if token_org(&key).as_deref() == Some(filter) && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        info!(status = "ok", count = keys.len(), "Retrieved key list");
        Ok(keys)
    }

    /// Remove a key and its quota counters
    pub async fn delete(
        &self,
        key: &str,
        org_id: &str,
        api_id: &str,
        is_hashed: bool,
    ) -> Result<KeyChange, DomainError> {
        let session = self
            .sessions
            .get(org_id, key, is_hashed)
            .await?
            .ok_or_else(|| DomainError::not_found("There is no such key found"))?;
        let key = session.key_id.clone();

        if !self.sessions.delete(org_id, &key, is_hashed).await? {
            error!(key = %obfuscate_key(&key), status = "fail", "Failed to remove the key");
            return Err(DomainError::validation("Failed to remove the key"));
        }

        self.quota.delete_counters(&key, &session, is_hashed).await?;

        if api_id == ALL_APIS {
            info!(key = %obfuscate_key(&key), status = "ok", "Deleted key across all APIs");
        } else {
            info!(key = %obfuscate_key(&key), status = "ok", "Deleted key");
        }

        Ok(KeyChange::new(key, KeyAction::Deleted))
    }

    /// Replace the policies of a key known only by its hash
    pub async fn update_hashed_key_policies(
        &self,
        key_hash: &str,
        policy: &str,
        mut apply_policies: Vec<String>,
    ) -> Result<KeyChange, DomainError> {
        warn!(key = %obfuscate_key(key_hash), "Hashed key change request detected");

        if !policy.is_empty() {
            apply_policies.push(policy.to_string());
        }

        let org_id = apply_policies
            .first()
            .and_then(|id| self.registry.policy(id))
            .map(|policy| policy.org_id.clone())
            .unwrap_or_default();

        let mut session = self
            .sessions
            .get(&org_id, key_hash, true)
            .await?
            .ok_or_else(|| {
                error!(key = %obfuscate_key(key_hash), status = "fail", "Failed to update hashed key");
                DomainError::not_found("Key not found")
            })?;
        let key = session.key_id.clone();

        session.touch(Utc::now().timestamp());
        session.apply_policy_id.clear();
        session.apply_policies = apply_policies;

        self.sessions
            .set(&key, &session, None, true)
            .await
            .map_err(|e| {
                error!(key = %obfuscate_key(&key), error = %e, "Failed to update hashed key");
                DomainError::storage("Could not write key data")
            })?;

        info!(key = %obfuscate_key(&key), status = "ok", "Updated hashed key");
        Ok(KeyChange::new(key, KeyAction::Updated))
    }
}

fn creation_error(e: DomainError) -> DomainError {
    match e {
        DomainError::Storage { .. } | DomainError::Encoding { .. } | DomainError::Internal { .. } => {
            DomainError::storage(format!("Failed to create key - {}", e.message()))
        }
        other => other,
    }
}

/// Keep the running quota and rate windows of `original` on `session`
fn carry_forward_windows(original: &SessionState, session: &mut SessionState) {
    session.quota_renews = original.quota_renews;
    session.last_updated = original.last_updated.clone();

    for (api_id, access) in &original.access_rights {
        let Some(previous) = access.effective_limit() else {
            continue;
        };

        if let Some(limit) = session
            .access_rights
            .get_mut(api_id)
            .and_then(|access| access.limit.as_mut())
            .filter(|limit| !limit.is_empty())
        {
            limit.quota_renews = previous.quota_renews;
        }
    }
}
