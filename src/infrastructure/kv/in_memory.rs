//! In-memory key-value store for single-node deployments and tests

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe in-memory store with TTLs, counters and sorted sets
///
/// Expired entries are dropped lazily on access.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    sorted_sets: RwLock<HashMap<String, Vec<(String, f64)>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live plain entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Translate a `*` glob into an anchored regex
pub(crate) fn glob_to_regex(pattern: &str) -> Result<Regex, DomainError> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    let source = format!("^{}$", escaped.join(".*"));

    Regex::new(&source).map_err(|e| DomainError::storage(format!("Invalid pattern: {}", e)))
}

fn in_range(score: f64, from: f64, to: f64) -> bool {
    score >= from && score <= to
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), DomainError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        let removed_set = self.sorted_sets.write().await.remove(key);

        Ok(removed.is_some_and(|e| !e.is_expired(now)) || removed_set.is_some())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let current = entry.value.parse::<i64>().map_err(|_| {
                    DomainError::storage(format!("Value at '{}' is not an integer", key))
                })?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current + delta;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );

        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let regex = glob_to_regex(pattern)?;
        let now = Instant::now();

        let mut keys: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(key, entry)| !entry.is_expired(now) && regex.is_match(key))
                .map(|(key, _)| key.clone())
                .collect()
        };

        let sets = self.sorted_sets.read().await;
        keys.extend(sets.keys().filter(|key| regex.is_match(key)).cloned());
        keys.sort();

        Ok(keys)
    }

    async fn add_to_sorted_set(
        &self,
        key: &str,
        member: &str,
        score: f64,
    ) -> Result<(), DomainError> {
        let mut sets = self.sorted_sets.write().await;
        let set = sets.entry(key.to_string()).or_default();

        set.retain(|(existing, _)| existing != member);
        set.push((member.to_string(), score));
        set.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        Ok(())
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<Vec<(String, f64)>, DomainError> {
        let sets = self.sorted_sets.read().await;

        Ok(sets
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(_, score)| in_range(*score, from, to))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn remove_from_sorted_set(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut sets = self.sorted_sets.write().await;

        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };

        let before = set.len();
        set.retain(|(existing, _)| existing != member);
        let removed = set.len() != before;

        if set.is_empty() {
            sets.remove(key);
        }

        Ok(removed)
    }

    async fn remove_sorted_set_range(
        &self,
        key: &str,
        from: f64,
        to: f64,
    ) -> Result<usize, DomainError> {
        let mut sets = self.sorted_sets.write().await;

        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };

        let before = set.len();
        set.retain(|(_, score)| !in_range(*score, from, to));
        let removed = before - set.len();

        if set.is_empty() {
            sets.remove(key);
        }

        Ok(removed)
    }
}
