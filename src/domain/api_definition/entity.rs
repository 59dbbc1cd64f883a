//! API definition entity

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Vendor extension under which an OAS document carries the gateway definition
pub const OAS_EXTENSION: &str = "x-gateway";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen_path: String,
    pub target_url: String,
    pub strip_listen_path: bool,
}

/// An API published through the gateway
///
/// Fields the control plane does not interpret are kept in `extra` so a
/// definition survives a read/write cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDefinition {
    pub api_id: String,
    pub name: String,
    pub org_id: String,
    pub active: bool,
    pub proxy: ProxyConfig,
    pub use_oauth2: bool,
    pub enable_jwt: bool,
    pub dont_set_quotas_on_create: bool,
    /// Seconds a session stays in the store after its last write; zero keeps it
    pub session_lifetime: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiDefinition {
    pub fn new(
        api_id: impl Into<String>,
        org_id: impl Into<String>,
        listen_path: impl Into<String>,
    ) -> Self {
        let api_id = api_id.into();
        Self {
            name: api_id.clone(),
            api_id,
            org_id: org_id.into(),
            active: true,
            proxy: ProxyConfig {
                listen_path: listen_path.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_oauth2(mut self, enabled: bool) -> Self {
        self.use_oauth2 = enabled;
        self
    }

    pub fn with_jwt(mut self, enabled: bool) -> Self {
        self.enable_jwt = enabled;
        self
    }

    pub fn with_quotas_on_create(mut self, enabled: bool) -> Self {
        self.dont_set_quotas_on_create = !enabled;
        self
    }

    pub fn with_session_lifetime(mut self, seconds: i64) -> Self {
        self.session_lifetime = seconds;
        self
    }

    /// Can hold OAuth clients registered through a policy
    pub fn accepts_oauth_clients(&self) -> bool {
        self.use_oauth2 || self.enable_jwt
    }

    /// Build the OAS companion document, reusing `existing` when present so
    /// hand-written paths and schemas are kept
    pub fn to_oas(&self, existing: Option<Value>) -> Result<Value, serde_json::Error> {
        let extension = serde_json::to_value(self)?;

        let mut document = match existing {
            Some(Value::Object(map)) => Value::Object(map),
            _ => json!({
                "openapi": "3.0.3",
                "info": { "title": self.name, "version": "1.0.0" },
                "paths": {},
            }),
        };

        if let Value::Object(map) = &mut document {
            map.insert(OAS_EXTENSION.to_string(), extension);
        }

        Ok(document)
    }

    /// Extract the gateway definition carried by an OAS document
    pub fn from_oas(document: &Value) -> Option<Result<Self, serde_json::Error>> {
        document
            .get(OAS_EXTENSION)
            .map(|extension| serde_json::from_value(extension.clone()))
    }
}
