//! In-memory snapshot of API definitions and policies

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::domain::{ApiDefinition, Policy};

type ApiMap = HashMap<String, Arc<ApiDefinition>>;
type PolicyMap = HashMap<String, Arc<Policy>>;

/// Live registry of definitions
///
/// Readers copy an `Arc` to the current map and release the lock straight
/// away; a reload replaces the maps wholesale, so a reader holding a
/// previous snapshot keeps a consistent view of it.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    apis: RwLock<Arc<ApiMap>>,
    policies: RwLock<Arc<PolicyMap>>,
    generation: AtomicU64,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(apis: Vec<ApiDefinition>, policies: Vec<Policy>) -> Self {
        let registry = Self::new();
        registry.replace(apis, policies);
        registry
    }

    fn api_snapshot(&self) -> Arc<ApiMap> {
        match self.apis.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn policy_snapshot(&self) -> Arc<PolicyMap> {
        match self.policies.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn api(&self, api_id: &str) -> Option<Arc<ApiDefinition>> {
        self.api_snapshot().get(api_id).cloned()
    }

    /// Every API, sorted by ID
    pub fn apis(&self) -> Vec<Arc<ApiDefinition>> {
        let mut apis: Vec<_> = self.api_snapshot().values().cloned().collect();
        apis.sort_by(|a, b| a.api_id.cmp(&b.api_id));
        apis
    }

    /// IDs of the APIs owned by `org_id`; an empty org matches every API
    pub fn api_ids_for_org(&self, org_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .api_snapshot()
            .values()
            .filter(|api| org_id.is_empty() || api.org_id == org_id)
            .map(|api| api.api_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// An API owned by `org_id`, or any API at all when the org owns none
    pub fn spec_for_org(&self, org_id: &str) -> Option<Arc<ApiDefinition>> {
        let apis = self.apis();

        apis.iter()
            .find(|api| api.org_id == org_id)
            .or_else(|| apis.first())
            .cloned()
    }

    pub fn org_has_apis(&self, org_id: &str) -> bool {
        self.api_snapshot().values().any(|api| api.org_id == org_id)
    }

    pub fn policy(&self, policy_id: &str) -> Option<Arc<Policy>> {
        self.policy_snapshot().get(policy_id).cloned()
    }

    /// Every policy, sorted by ID
    pub fn policies(&self) -> Vec<Arc<Policy>> {
        let mut policies: Vec<_> = self.policy_snapshot().values().cloned().collect();
        policies.sort_by(|a, b| a.id.cmp(&b.id));
        policies
    }

    /// Number of swaps performed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Swap in a new snapshot
    pub(crate) fn replace(&self, apis: Vec<ApiDefinition>, policies: Vec<Policy>) {
        let api_map: ApiMap = apis
            .into_iter()
            .map(|api| (api.api_id.clone(), Arc::new(api)))
            .collect();
        let policy_map: PolicyMap = policies
            .into_iter()
            .map(|policy| (policy.id.clone(), Arc::new(policy)))
            .collect();

        let (api_count, policy_count) = (api_map.len(), policy_map.len());

        match self.apis.write() {
            Ok(mut guard) => *guard = Arc::new(api_map),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(api_map),
        }
        match self.policies.write() {
            Ok(mut guard) => *guard = Arc::new(policy_map),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(policy_map),
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            generation,
            apis = api_count,
            policies = policy_count,
            "Registry snapshot swapped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ConfigRegistry {
        ConfigRegistry::from_definitions(
            vec![
                ApiDefinition::new("api1", "org1", "/api1/"),
                ApiDefinition::new("api2", "org1", "/api2/"),
                ApiDefinition::new("api3", "org2", "/api3/"),
            ],
            vec![Policy::new("p1", "org1")],
        )
    }

    #[test]
    fn test_lookups() {
        let registry = registry();

        assert_eq!(registry.api("api1").unwrap().org_id, "org1");
        assert!(registry.api("missing").is_none());
        assert_eq!(registry.policy("p1").unwrap().org_id, "org1");
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn test_api_ids_for_org() {
        let registry = registry();

        assert_eq!(registry.api_ids_for_org("org1"), vec!["api1", "api2"]);
        assert_eq!(registry.api_ids_for_org(""), vec!["api1", "api2", "api3"]);
        assert!(registry.api_ids_for_org("nobody").is_empty());
    }

    #[test]
    fn test_spec_for_org_falls_back() {
        let registry = registry();

        assert_eq!(registry.spec_for_org("org2").unwrap().api_id, "api3");
        assert!(registry.spec_for_org("nobody").is_some());
        assert!(!registry.org_has_apis("nobody"));
        assert!(ConfigRegistry::new().spec_for_org("org1").is_none());
    }

    #[test]
    fn test_old_snapshot_survives_swap() {
        let registry = registry();
        let held = registry.api("api1").unwrap();

        registry.replace(vec![ApiDefinition::new("api9", "org9", "/")], vec![]);

        assert_eq!(held.api_id, "api1");
        assert!(registry.api("api1").is_none());
        assert!(registry.policy("p1").is_none());
        assert_eq!(registry.generation(), 2);
    }
}
