//! Merge referenced policies into a session

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::session::{AccessDefinition, SessionState};
use crate::domain::DomainError;
use crate::infrastructure::registry::ConfigRegistry;

/// Replace zero-valued per-API limits with no limit at all
///
/// An all-zero limit means "inherit the session's global limits"; leaving
/// it in place would read as a phantom override of zero.
pub fn reset_api_limits(access_rights: &mut BTreeMap<String, AccessDefinition>) {
    for access in access_rights.values_mut() {
        if access.limit.as_ref().is_some_and(|limit| limit.is_empty()) {
            access.limit = None;
        }
    }
}

/// Applies the policies a session references, in the session's order
#[derive(Debug, Clone)]
pub struct PolicyApplier {
    registry: Arc<ConfigRegistry>,
}

impl PolicyApplier {
    pub fn new(registry: Arc<ConfigRegistry>) -> Self {
        Self { registry }
    }

    /// Merge every referenced policy into `session`
    ///
    /// For an API covered by several policies the last one wins. Access
    /// rights no policy mentions keep whatever the caller sent.
    pub fn apply(&self, session: &mut SessionState) -> Result<(), DomainError> {
        let policy_ids = session.policy_ids();
        if policy_ids.is_empty() {
            reset_api_limits(&mut session.access_rights);
            return Ok(());
        }

        let mut rights: BTreeMap<String, AccessDefinition> = BTreeMap::new();

        for policy_id in &policy_ids {
            let policy = self.registry.policy(policy_id).ok_or_else(|| {
                warn!(policy_id = %policy_id, org_id = %session.org_id, "Policy not found");
                DomainError::not_found(format!("policy not found: {}", policy_id))
            })?;

            if !policy.org_id.is_empty() && policy.org_id != session.org_id {
                warn!(
                    policy_id = %policy_id,
                    org_id = %session.org_id,
                    "Policy belongs to a different organisation"
                );
                return Err(DomainError::validation(
                    "attempting to apply policy from different organisation to key",
                ));
            }

            let partitions = policy.partitions;

            if partitions.applies_acl() {
                for (api_id, access) in &policy.access_rights {
                    let mut merged = access.clone();
                    if merged.api_id.is_empty() {
                        merged.api_id = api_id.clone();
                    }

                    // Keep the running quota window of an existing override
                    let current_renews = session
                        .access_rights
                        .get(api_id)
                        .and_then(AccessDefinition::effective_limit)
                        .map(|limit| limit.quota_renews);
                    if let (Some(limit), Some(renews)) = (merged.limit.as_mut(), current_renews) {
                        limit.quota_renews = renews;
                    }

                    rights.insert(api_id.clone(), merged);
                }
            }

            if partitions.applies_quota() {
                session.quota_max = policy.quota_max;
                session.quota_renewal_rate = policy.quota_renewal_rate;
            }

            if partitions.applies_rate_limit() {
                session.rate = policy.rate;
                session.per = policy.per;
            }

            if policy.is_inactive {
                session.is_inactive = true;
            }

            for tag in &policy.tags {
                if !session.tags.contains(tag) {
                    session.tags.push(tag.clone());
                }
            }

            debug!(policy_id = %policy_id, "Policy applied");
        }

        session.access_rights.extend(rights);
        reset_api_limits(&mut session.access_rights);

        Ok(())
    }

    /// Forced lifetime in seconds for a brand-new key, from the last
    /// referenced policy that sets one
    pub fn trial_period(&self, session: &SessionState) -> Option<i64> {
        session
            .policy_ids()
            .iter()
            .filter_map(|id| self.registry.policy(id))
            .filter(|policy| policy.key_expires_in > 0)
            .map(|policy| policy.key_expires_in)
            .last()
    }
}
