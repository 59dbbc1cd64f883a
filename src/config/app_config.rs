use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::session::HashAlgorithm;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Redis,
}

/// Where sessions, quotas and OAuth data live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: String,
    pub key_prefix: String,
}

/// Control plane behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Shared secret expected in the admin header; empty locks the admin API
    pub secret: String,
    pub hash_keys: bool,
    /// `sha256`, `sha512` or empty for the legacy key format
    pub hash_key_function: String,
    /// Function keys were hashed with before `hash_key_function` changed
    pub legacy_hash_key_function: String,
    pub enable_hashed_keys_listing: bool,
    pub allow_master_keys: bool,
    pub app_path: String,
    pub policy_path: String,
    /// Generated at startup when empty
    pub node_id: String,
    pub notification_channel: String,
    pub suppress_default_org_store: bool,
    pub harden_definition_writes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: String::new(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            hash_keys: false,
            hash_key_function: String::new(),
            legacy_hash_key_function: String::new(),
            enable_hashed_keys_listing: false,
            allow_master_keys: false,
            app_path: "./apps".to_string(),
            policy_path: "./policies".to_string(),
            node_id: String::new(),
            notification_channel: "gateway.cluster.notifications".to_string(),
            suppress_default_org_store: false,
            harden_definition_writes: false,
        }
    }
}

impl GatewayConfig {
    pub fn hash_function(&self) -> Result<Option<HashAlgorithm>, DomainError> {
        parse_hash_function(&self.hash_key_function)
    }

    pub fn legacy_hash_function(&self) -> Result<Option<HashAlgorithm>, DomainError> {
        parse_hash_function(&self.legacy_hash_key_function)
    }
}

fn parse_hash_function(name: &str) -> Result<Option<HashAlgorithm>, DomainError> {
    if name.trim().is_empty() {
        return Ok(None);
    }
    name.parse().map(Some)
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the server could not start with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.server.port == 0 {
            return Err(DomainError::configuration("server.port must be set"));
        }

        if self.storage.backend == StorageBackend::Redis && self.storage.redis_url.is_empty() {
            return Err(DomainError::configuration(
                "storage.redis_url is required for the redis backend",
            ));
        }

        self.gateway.hash_function()?;
        self.gateway.legacy_hash_function()?;

        if self.gateway.app_path.is_empty() || self.gateway.policy_path.is_empty() {
            return Err(DomainError::configuration(
                "gateway.app_path and gateway.policy_path must be set",
            ));
        }

        Ok(())
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.gateway.secret.is_empty() {
            config.gateway.secret = "[REDACTED]".to_string();
        }
        config
    }
}
