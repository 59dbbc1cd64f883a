//! Backing key-value store trait

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Shared key-value store with atomic counters and sorted sets
///
/// Values are raw strings so the trait stays dyn-compatible; the typed
/// helpers live on [`KeyValueStoreExt`]. Patterns passed to `keys` support
/// the `*` wildcard only. Sorted-set bounds accept `f64::NEG_INFINITY` and
/// `f64::INFINITY`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores a value, replacing any previous one; `None` keeps it forever
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError>;

    /// Returns true if the key existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Returns the number of keys removed
    async fn delete_many(&self, keys: &[String]) -> Result<usize, DomainError> {
        let mut removed = 0;

        for key in keys {
            if self.delete(key).await? {
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Atomically adds `delta`, creating the counter at zero first
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError>;

    /// Sets a TTL on an existing key; false if the key is absent
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError>;

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError>;

    async fn add_to_sorted_set(&self, key: &str, member: &str, score: f64)
        -> Result<(), DomainError>;

    /// Members with `from <= score <= to`, ascending by score
    async fn sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<Vec<(String, f64)>, DomainError>;

    async fn remove_from_sorted_set(&self, key: &str, member: &str) -> Result<bool, DomainError>;

    /// Removes members with `from <= score <= to`, returning how many went
    async fn remove_sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<usize, DomainError>;
}

/// Typed JSON helpers over any [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::encoding(format!("Failed to decode stored value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    fn set_json<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::encoding(format!("Failed to encode value: {}", e))
            })?;
            self.set(key, &data, ttl).await
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

/// Render a sorted-set bound the way redis expects it
pub fn score_bound(score: f64) -> String {
    if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if score == f64::INFINITY {
        "+inf".to_string()
    } else {
        score.to_string()
    }
}
