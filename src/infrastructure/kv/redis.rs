//! Redis-backed key-value store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::storage::{score_bound, KeyValueStore};
use crate::domain::DomainError;

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Prefix applied to every key, for sharing a database between fleets
    pub key_prefix: Option<String>,
    /// Keys fetched per SCAN round trip
    pub scan_count: usize,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            scan_count: 100,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.key_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }
}

/// Shared store backed by Redis
///
/// Counters use INCRBY and sorted sets map onto ZADD/ZRANGEBYSCORE, so the
/// per-key atomicity is Redis's own.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        match &self.config.key_prefix {
            Some(prefix) => key.strip_prefix(prefix.as_str()).map(str::to_string).unwrap_or(key),
            None => key,
        }
    }
}

/// Escapes every Redis MATCH metacharacter except `*`, so `*` is the
/// only wildcard as with the in-memory store.
fn escape_match_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());

    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get key: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: redis::RedisResult<()> = match ttl {
            Some(ttl) => conn.set_ex(&prefixed_key, value, ttl.as_secs().max(1)).await,
            None => conn.set(&prefixed_key, value).await,
        };

        result.map_err(|e| DomainError::storage(format!("Failed to set key: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(self.prefix_key(key))
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete key: {}", e)))?;

        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let prefixed: Vec<String> = keys.iter().map(|k| self.prefix_key(k)).collect();
        let mut conn = self.connection.clone();

        let deleted: usize = conn
            .del(&prefixed)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete keys: {}", e)))?;

        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(self.prefix_key(key))
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check key existence: {}", e)))
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let mut conn = self.connection.clone();

        conn.incr(self.prefix_key(key), delta)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to increment counter: {}", e)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1) as i64;

        conn.expire(self.prefix_key(key), ttl_secs)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update TTL: {}", e)))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let prefixed_pattern = escape_match_pattern(&self.prefix_key(pattern));
        let mut conn = self.connection.clone();

        // SCAN rather than KEYS so a large keyspace doesn't block the server
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&prefixed_pattern)
                .arg("COUNT")
                .arg(self.config.scan_count)
                .query_async(&mut conn)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to scan keys: {}", e)))?;

            found.extend(keys.into_iter().map(|k| self.strip_prefix(k)));
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }

    async fn add_to_sorted_set(
        &self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: i64 = conn
            .zadd(self.prefix_key(key), member, score)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to add to sorted set: {}", e)))?;

        Ok(())
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<Vec<(String, f64)>, DomainError> {
        let mut conn = self.connection.clone();

        conn.zrangebyscore_withscores(self.prefix_key(key), score_bound(from), score_bound(to))
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read sorted set: {}", e)))
    }

    async fn remove_from_sorted_set(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let removed: i64 = conn
            .zrem(self.prefix_key(key), member)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to remove from sorted set: {}", e))
            })?;

        Ok(removed > 0)
    }

    async fn remove_sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        conn.zrembyscore(self.prefix_key(key), score_bound(from), score_bound(to))
            .await
            .map_err(|e| DomainError::storage(format!("Failed to trim sorted set: {}", e)))
    }
}
