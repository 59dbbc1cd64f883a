//! Quota counters and remaining-quota computation

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::identity::KeyIdentity;
use super::store::QUOTA_KEY_PREFIX;
use crate::domain::session::SessionState;
use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;
use crate::infrastructure::logging::obfuscate_key;

/// Usage counters for a session namespace
///
/// The session's global quota and each access right's own quota are
/// separate counters; an access right with an allowance scope gets a
/// counter of its own, otherwise it shares the global one.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    store: Arc<dyn KeyValueStore>,
    identity: KeyIdentity,
    namespace: String,
}

impl QuotaLedger {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        identity: KeyIdentity,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            namespace: namespace.into(),
        }
    }

    /// `remaining = max(0, max - used)`; an absent counter means nothing used
    pub fn remaining(max: i64, used: Option<i64>) -> i64 {
        (max - used.unwrap_or(0)).max(0)
    }

    fn address(&self, key: &str, is_hashed: bool) -> String {
        if is_hashed {
            key.to_string()
        } else {
            self.identity.hash_key(key)
        }
    }

    /// Counter key for `address`, optionally under an allowance scope
    pub fn counter_key(&self, scope: &str, address: &str) -> String {
        if scope.is_empty() {
            format!("{}{}{}", self.namespace, QUOTA_KEY_PREFIX, address)
        } else {
            format!("{}{}{}-{}", self.namespace, QUOTA_KEY_PREFIX, scope, address)
        }
    }

    fn window(renewal_rate: i64) -> Option<Duration> {
        (renewal_rate > 0).then(|| Duration::from_secs(renewal_rate as u64))
    }

    /// Zero the session's counters and start new renewal windows
    pub async fn reset_quota(
        &self,
        key: &str,
        session: &mut SessionState,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        let now = Utc::now().timestamp();
        let address = self.address(key, is_hashed);

        if session.quota_max != -1 {
            self.store
                .set(
                    &self.counter_key("", &address),
                    "0",
                    Self::window(session.quota_renewal_rate),
                )
                .await?;
        }
        session.quota_renews = now + session.quota_renewal_rate;

        for access in session.access_rights.values_mut() {
            let scope = access.allowance_scope.clone();
            let Some(limit) = access.limit.as_mut().filter(|limit| !limit.is_empty()) else {
                continue;
            };

            if !scope.is_empty() && !limit.is_unlimited() {
                self.store
                    .set(
                        &self.counter_key(&scope, &address),
                        "0",
                        Self::window(limit.quota_renewal_rate),
                    )
                    .await?;
            }
            limit.quota_renews = now + limit.quota_renewal_rate;
        }

        debug!(key = %obfuscate_key(key), "Quota reset");
        Ok(())
    }

    /// Count one unit of usage, opening the renewal window on first use
    pub async fn record_usage(
        &self,
        key: &str,
        is_hashed: bool,
        scope: &str,
        renewal_rate: i64,
    ) -> Result<i64, DomainError> {
        let counter = self.counter_key(scope, &self.address(key, is_hashed));
        let used = self.store.increment(&counter, 1).await?;

        if used == 1 {
            if let Some(window) = Self::window(renewal_rate) {
                self.store.expire(&counter, window).await?;
            }
        }

        Ok(used)
    }

    /// Current usage, `None` when the counter is absent
    pub async fn usage(
        &self,
        key: &str,
        is_hashed: bool,
        scope: &str,
    ) -> Result<Option<i64>, DomainError> {
        let counter = self.counter_key(scope, &self.address(key, is_hashed));

        match self.store.get(&counter).await? {
            Some(raw) => match raw.parse::<i64>() {
                Ok(used) => Ok(Some(used)),
                Err(_) => {
                    warn!(counter = %counter, "Ignoring non-numeric quota counter");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Fill in the derived remaining quota for the session and every
    /// access right carrying its own limit
    pub async fn populate_remaining(
        &self,
        key: &str,
        session: &mut SessionState,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        if session.quota_max != -1 {
            let used = self.usage(key, is_hashed, "").await?;
            session.quota_remaining = Self::remaining(session.quota_max, used);
        }

        for access in session.access_rights.values_mut() {
            let scope = access.allowance_scope.clone();
            let Some(limit) = access.limit.as_mut().filter(|limit| !limit.is_empty()) else {
                continue;
            };

            if limit.is_unlimited() {
                continue;
            }

            let used = self.usage(key, is_hashed, &scope).await?;
            limit.quota_remaining = Self::remaining(limit.quota_max, used);
        }

        Ok(())
    }

    /// Drop every counter belonging to the session
    pub async fn delete_counters(
        &self,
        key: &str,
        session: &SessionState,
        is_hashed: bool,
    ) -> Result<(), DomainError> {
        let address = self.address(key, is_hashed);
        let mut counters = vec![self.counter_key("", &address)];

        counters.extend(
            session
                .access_rights
                .values()
                .filter(|access| !access.allowance_scope.is_empty())
                .map(|access| self.counter_key(&access.allowance_scope, &address)),
        );

        self.store.delete_many(&counters).await?;
        Ok(())
    }
}
