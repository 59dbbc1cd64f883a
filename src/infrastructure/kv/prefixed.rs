//! Key-prefix namespace over another store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

/// Views a shared store through a fixed key prefix
///
/// Keys returned by `keys` come back with the prefix stripped.
#[derive(Debug, Clone)]
pub struct PrefixedStore {
    inner: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl PrefixedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl KeyValueStore for PrefixedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.inner.get(&self.key(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
        self.inner.set(&self.key(key), value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        self.inner.delete(&self.key(key)).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        let prefixed: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        self.inner.delete_many(&prefixed).await
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        self.inner.exists(&self.key(key)).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        self.inner.increment(&self.key(key), delta).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        self.inner.expire(&self.key(key), ttl).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let keys = self.inner.keys(&self.key(pattern)).await?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.prefix.as_str()).map(str::to_string))
            .collect())
    }

    async fn add_to_sorted_set(
        &self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), DomainError> {
        self.inner.add_to_sorted_set(&self.key(key), member, score).await
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<Vec<(String, f64)>, DomainError> {
        self.inner.sorted_set_range(&self.key(key), from, to).await
    }

    async fn remove_from_sorted_set(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        self.inner.remove_from_sorted_set(&self.key(key), member).await
    }

    async fn remove_sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<usize, DomainError> {
        self.inner.remove_sorted_set_range(&self.key(key), from, to).await
    }
}
