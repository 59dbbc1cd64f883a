//! Policy entity

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::session::AccessDefinition;

/// Selects which parts of a policy are applied to a session; all off means
/// the whole policy applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyPartitions {
    pub quota: bool,
    pub rate_limit: bool,
    pub acl: bool,
}

impl PolicyPartitions {
    pub fn enabled(&self) -> bool {
        self.quota || self.rate_limit || self.acl
    }

    pub fn applies_quota(&self) -> bool {
        !self.enabled() || self.quota
    }

    pub fn applies_rate_limit(&self) -> bool {
        !self.enabled() || self.rate_limit
    }

    pub fn applies_acl(&self) -> bool {
        !self.enabled() || self.acl
    }
}

/// A named, reusable bundle of access rights and limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub id: String,
    pub name: String,
    pub org_id: String,
    pub rate: f64,
    pub per: f64,
    pub quota_max: i64,
    pub quota_renewal_rate: i64,
    pub access_rights: BTreeMap<String, AccessDefinition>,
    pub active: bool,
    pub is_inactive: bool,
    pub tags: Vec<String>,
    /// Trial period in seconds applied to newly created keys
    pub key_expires_in: i64,
    pub partitions: PolicyPartitions,
}

impl Policy {
    pub fn new(id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            org_id: org_id.into(),
            active: true,
            ..Default::default()
        }
    }

    pub fn with_access_right(mut self, api_id: impl Into<String>, access: AccessDefinition) -> Self {
        self.access_rights.insert(api_id.into(), access);
        self
    }

    pub fn with_quota(mut self, quota_max: i64, renewal_rate: i64) -> Self {
        self.quota_max = quota_max;
        self.quota_renewal_rate = renewal_rate;
        self
    }

    pub fn with_rate(mut self, rate: f64, per: f64) -> Self {
        self.rate = rate;
        self.per = per;
        self
    }

    pub fn with_trial_period(mut self, seconds: i64) -> Self {
        self.key_expires_in = seconds;
        self
    }

    pub fn covers_api(&self, api_id: &str) -> bool {
        self.access_rights.contains_key(api_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_default_applies_everything() {
        let partitions = PolicyPartitions::default();
        assert!(partitions.applies_acl());
        assert!(partitions.applies_quota());
        assert!(partitions.applies_rate_limit());
    }

    #[test]
    fn test_partitions_select() {
        let partitions = PolicyPartitions {
            quota: true,
            ..Default::default()
        };
        assert!(partitions.applies_quota());
        assert!(!partitions.applies_acl());
        assert!(!partitions.applies_rate_limit());
    }

    #[test]
    fn test_policy_deserialize() {
        let policy: Policy = serde_json::from_str(
            r#"{"id":"p1","org_id":"org1","access_rights":{"api1":{"api_id":"api1"}},"key_expires_in":60}"#,
        )
        .unwrap();

        assert_eq!(policy.id, "p1");
        assert!(policy.covers_api("api1"));
        assert_eq!(policy.key_expires_in, 60);
    }
}
