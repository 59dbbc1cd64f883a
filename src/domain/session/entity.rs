//! Session (key) records and their per-API access rights

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quota and rate limit override for a single API
///
/// A limit with every field zero carries no override at all; lookups fall
/// back to the session's global limits in that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiLimit {
    pub rate: f64,
    pub per: f64,
    pub throttle_interval: f64,
    pub throttle_retry_limit: i64,
    pub max_query_depth: i64,
    pub quota_max: i64,
    pub quota_renews: i64,
    pub quota_remaining: i64,
    pub quota_renewal_rate: i64,
}

impl ApiLimit {
    /// True when every field holds its zero value
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Quota max of -1 disables quota tracking
    pub fn is_unlimited(&self) -> bool {
        self.quota_max == -1
    }
}

/// A session's permission and limits for one API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessDefinition {
    pub api_name: String,
    pub api_id: String,
    pub versions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<ApiLimit>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub allowance_scope: String,
}

impl AccessDefinition {
    pub fn new(api_id: impl Into<String>) -> Self {
        Self {
            api_id: api_id.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: ApiLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_allowance_scope(mut self, scope: impl Into<String>) -> Self {
        self.allowance_scope = scope.into();
        self
    }

    /// The override limit, if one is actually set
    pub fn effective_limit(&self) -> Option<&ApiLimit> {
        self.limit.as_ref().filter(|limit| !limit.is_empty())
    }

    pub fn has_limit(&self) -> bool {
        self.effective_limit().is_some()
    }
}

/// How a stored basic-auth password is encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    #[default]
    #[serde(alias = "")]
    Plaintext,
    Argon2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAuthData {
    pub password: String,
    pub hash_type: HashType,
}

/// A credential record: access rights, quotas, rate limits and expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Storage identifier; the hash when the session is addressed by hash
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_id: String,
    pub org_id: String,
    pub access_rights: BTreeMap<String, AccessDefinition>,

    pub rate: f64,
    pub per: f64,
    pub throttle_interval: f64,
    pub throttle_retry_limit: i64,
    pub max_query_depth: i64,
    pub allowance: f64,

    pub quota_max: i64,
    pub quota_renews: i64,
    /// Derived at read time from the usage counter; never persisted
    pub quota_remaining: i64,
    pub quota_renewal_rate: i64,

    /// Absolute unix time; zero means never
    pub expires: i64,
    pub date_created: DateTime<Utc>,
    pub last_updated: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub apply_policy_id: String,
    pub apply_policies: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate: String,
    pub basic_auth_data: BasicAuthData,
    pub hmac_enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hmac_string: String,

    pub is_inactive: bool,
    pub tags: Vec<String>,
    pub alias: String,
    pub meta_data: Value,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            org_id: String::new(),
            access_rights: BTreeMap::new(),
            rate: 0.0,
            per: 0.0,
            throttle_interval: 0.0,
            throttle_retry_limit: 0,
            max_query_depth: 0,
            allowance: 0.0,
            quota_max: 0,
            quota_renews: 0,
            quota_remaining: 0,
            quota_renewal_rate: 0,
            expires: 0,
            date_created: DateTime::<Utc>::UNIX_EPOCH,
            last_updated: String::new(),
            apply_policy_id: String::new(),
            apply_policies: Vec::new(),
            certificate: String::new(),
            basic_auth_data: BasicAuthData::default(),
            hmac_enabled: false,
            hmac_string: String::new(),
            is_inactive: false,
            tags: Vec::new(),
            alias: String::new(),
            meta_data: Value::Object(Default::default()),
        }
    }
}

impl SessionState {
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            ..Default::default()
        }
    }

    pub fn with_access_right(mut self, api_id: impl Into<String>, access: AccessDefinition) -> Self {
        self.access_rights.insert(api_id.into(), access);
        self
    }

    pub fn with_policies(mut self, policies: Vec<String>) -> Self {
        self.apply_policies = policies;
        self
    }

    pub fn with_quota(mut self, quota_max: i64, renewal_rate: i64) -> Self {
        self.quota_max = quota_max;
        self.quota_renewal_rate = renewal_rate;
        self
    }

    /// Policy IDs in application order; the legacy single-policy field is
    /// only consulted when the list is empty
    pub fn policy_ids(&self) -> Vec<String> {
        if !self.apply_policies.is_empty() {
            return self.apply_policies.clone();
        }

        if self.apply_policy_id.is_empty() {
            Vec::new()
        } else {
            vec![self.apply_policy_id.clone()]
        }
    }

    pub fn has_expired(&self, now: i64) -> bool {
        self.expires > 0 && self.expires < now
    }

    /// Stamp the rate limiter's "last updated" marker
    pub fn touch(&mut self, now: i64) {
        self.last_updated = now.to_string();
    }

    /// Copy with the derived quota fields cleared, ready to persist
    pub fn for_storage(&self) -> Self {
        let mut stored = self.clone();
        stored.quota_remaining = 0;

        for access in stored.access_rights.values_mut() {
            if let Some(limit) = access.limit.as_mut() {
                limit.quota_remaining = 0;
            }
        }

        stored
    }
}
