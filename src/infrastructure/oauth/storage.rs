//! Per-API OAuth client and token storage

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::oauth::{AccessToken, ClientToken, OAuthClient, RefreshToken, TokenTypeHint};
use crate::domain::storage::{KeyValueStore, KeyValueStoreExt};
use crate::domain::DomainError;
use crate::infrastructure::kv::PrefixedStore;

pub const CLIENT_PREFIX: &str = "oauth-clientid.";
pub const ACCESS_PREFIX: &str = "oauth-access-";
pub const REFRESH_PREFIX: &str = "oauth-refresh-";
pub const CLIENT_TOKENS_PREFIX: &str = "oauth-client-tokens.";

/// Tokens per page in paginated client token listings
pub const TOKENS_PAGE_SIZE: usize = 100;

/// Namespace of one API's OAuth data in the shared store
pub fn storage_prefix(api_id: &str) -> String {
    format!("oauth-data.{}-", api_id)
}

/// OAuth data of a single API
#[derive(Debug, Clone)]
pub struct OAuthStorage {
    api_id: String,
    store: PrefixedStore,
}

impl OAuthStorage {
    pub fn for_api(store: Arc<dyn KeyValueStore>, api_id: &str) -> Self {
        Self {
            api_id: api_id.to_string(),
            store: PrefixedStore::new(store, storage_prefix(api_id)),
        }
    }

    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    fn client_key(client_id: &str) -> String {
        format!("{}{}", CLIENT_PREFIX, client_id)
    }

    fn access_key(token: &str) -> String {
        format!("{}{}", ACCESS_PREFIX, token)
    }

    fn refresh_key(token: &str) -> String {
        format!("{}{}", REFRESH_PREFIX, token)
    }

    fn client_tokens_key(client_id: &str) -> String {
        format!("{}{}", CLIENT_TOKENS_PREFIX, client_id)
    }

    pub async fn get_client(&self, client_id: &str) -> Result<Option<OAuthClient>, DomainError> {
        self.store.get_json(&Self::client_key(client_id)).await
    }

    pub async fn set_client(&self, client: &OAuthClient) -> Result<(), DomainError> {
        self.store
            .set_json(&Self::client_key(&client.client_id), client, None)
            .await
    }

    pub async fn delete_client(&self, client_id: &str) -> Result<bool, DomainError> {
        self.store.delete(&Self::client_key(client_id)).await
    }

    /// Every client registered on this API, ordered by client ID
    pub async fn list_clients(&self) -> Result<Vec<OAuthClient>, DomainError> {
        let keys = self.store.keys(&format!("{}*", CLIENT_PREFIX)).await?;
        let mut clients = Vec::with_capacity(keys.len());

        for key in keys {
            match self.store.get_json::<OAuthClient>(&key).await {
                Ok(Some(client)) => clients.push(client),
                Ok(None) => {}
                Err(e) => {
                    warn!(api_id = %self.api_id, error = %e, "Skipping unreadable OAuth client")
                }
            }
        }

        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        Ok(clients)
    }

    /// Issue an access token for `client_id`, optionally with a refresh token
    pub async fn issue_token(
        &self,
        client_id: &str,
        lifetime: Duration,
        with_refresh: bool,
    ) -> Result<AccessToken, DomainError> {
        let expires_at = Utc::now().timestamp() + lifetime.as_secs() as i64;
        let token = Uuid::new_v4().simple().to_string();

        let refresh_token = if with_refresh {
            let refresh = RefreshToken {
                token: Uuid::new_v4().simple().to_string(),
                client_id: client_id.to_string(),
                access_token: token.clone(),
            };
            self.store
                .set_json(&Self::refresh_key(&refresh.token), &refresh, None)
                .await?;
            Some(refresh.token)
        } else {
            None
        };

        let access = AccessToken {
            token,
            client_id: client_id.to_string(),
            expires_at,
            refresh_token,
        };

        self.store
            .set_json(&Self::access_key(&access.token), &access, Some(lifetime))
            .await?;
        self.store
            .add_to_sorted_set(
                &Self::client_tokens_key(client_id),
                &access.token,
                expires_at as f64,
            )
            .await?;

        debug!(api_id = %self.api_id, client_id = %client_id, "Issued access token");
        Ok(access)
    }

    pub async fn get_access(&self, token: &str) -> Result<Option<AccessToken>, DomainError> {
        self.store.get_json(&Self::access_key(token)).await
    }

    pub async fn get_refresh(&self, token: &str) -> Result<Option<RefreshToken>, DomainError> {
        self.store.get_json(&Self::refresh_key(token)).await
    }

    /// Remove an access token and its client index entry
    pub async fn remove_access(&self, token: &str) -> Result<bool, DomainError> {
        if let Some(access) = self.get_access(token).await? {
            self.store
                .remove_from_sorted_set(&Self::client_tokens_key(&access.client_id), token)
                .await?;
        }

        self.store.delete(&Self::access_key(token)).await
    }

    pub async fn remove_refresh(&self, token: &str) -> Result<bool, DomainError> {
        self.store.delete(&Self::refresh_key(token)).await
    }

    /// Revoke one token; without a hint it is tried as both kinds
    pub async fn revoke_token(
        &self,
        token: &str,
        hint: Option<TokenTypeHint>,
    ) -> Result<(), DomainError> {
        match hint {
            Some(TokenTypeHint::AccessToken) => {
                self.remove_access(token).await?;
            }
            Some(TokenTypeHint::RefreshToken) => {
                self.remove_refresh(token).await?;
            }
            None => {
                self.remove_access(token).await?;
                self.remove_refresh(token).await?;
            }
        }
        Ok(())
    }

    /// Revoke every token of a client after checking its secret; returns
    /// the revoked access tokens
    pub async fn revoke_all_tokens(
        &self,
        client_id: &str,
        secret: &str,
    ) -> Result<Vec<String>, DomainError> {
        let client = self
            .get_client(client_id)
            .await?
            .ok_or_else(|| DomainError::not_found("oauth client doesn't exist"))?;

        if client.secret != secret {
            return Err(DomainError::unauthorized("client secret is wrong"));
        }

        let index = Self::client_tokens_key(client_id);
        let entries = self
            .store
            .sorted_set_range(&index, f64::NEG_INFINITY, f64::INFINITY)
            .await?;

        let mut revoked = Vec::with_capacity(entries.len());
        for (token, _) in entries {
            if let Some(access) = self.get_access(&token).await? {
                if let Some(refresh) = access.refresh_token.as_deref() {
                    self.remove_refresh(refresh).await?;
                }
            }
            self.store.delete(&Self::access_key(&token)).await?;
            revoked.push(token);
        }

        self.store
            .remove_sorted_set_range(&index, f64::NEG_INFINITY, f64::INFINITY)
            .await?;

        Ok(revoked)
    }

    /// Live tokens of a client, soonest expiry first
    ///
    /// Index entries that expired are pruned on the way.
    pub async fn client_tokens(&self, client_id: &str) -> Result<Vec<ClientToken>, DomainError> {
        let index = Self::client_tokens_key(client_id);
        let now = Utc::now().timestamp() as f64;

        self.store
            .remove_sorted_set_range(&index, f64::NEG_INFINITY, now)
            .await?;

        let entries = self.store.sorted_set_range(&index, now, f64::INFINITY).await?;
        Ok(entries
            .into_iter()
            .map(|(token, score)| ClientToken {
                token,
                expires: score as i64,
            })
            .collect())
    }

    /// One page (1-based) of live tokens and the total page count
    pub async fn paginated_client_tokens(
        &self,
        client_id: &str,
        page: usize,
    ) -> Result<(Vec<ClientToken>, usize), DomainError> {
        let tokens = self.client_tokens(client_id).await?;
        let total_pages = tokens.len().div_ceil(TOKENS_PAGE_SIZE);

        // Pages past the end, however far, are empty
        let Some(offset) = (page.max(1) - 1).checked_mul(TOKENS_PAGE_SIZE) else {
            return Ok((Vec::new(), total_pages));
        };
        let tokens = tokens
            .into_iter()
            .skip(offset)
            .take(TOKENS_PAGE_SIZE)
            .collect();

        Ok((tokens, total_pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kv::InMemoryStore;

    fn storage() -> (Arc<InMemoryStore>, OAuthStorage) {
        let store = Arc::new(InMemoryStore::new());
        let storage = OAuthStorage::for_api(store.clone(), "api1");
        (store, storage)
    }

    #[tokio::test]
    async fn test_client_crud_is_namespaced() {
        let (store, storage) = storage();
        let client = OAuthClient::new("c1", "s1").with_policy("p1");

        storage.set_client(&client).await.unwrap();
        assert!(store.exists("oauth-data.api1-oauth-clientid.c1").await.unwrap());
        assert_eq!(storage.get_client("c1").await.unwrap(), Some(client.clone()));

        storage.set_client(&OAuthClient::new("c0", "s0")).await.unwrap();
        let ids: Vec<String> = storage
            .list_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.client_id)
            .collect();
        assert_eq!(ids, vec!["c0".to_string(), "c1".to_string()]);

        // Another API sees nothing
        let other = OAuthStorage::for_api(store.clone(), "api2");
        assert!(other.list_clients().await.unwrap().is_empty());

        assert!(storage.delete_client("c1").await.unwrap());
        assert!(storage.get_client("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_and_list_tokens() {
        let (_, storage) = storage();

        let first = storage
            .issue_token("c1", Duration::from_secs(60), false)
            .await
            .unwrap();
        let second = storage
            .issue_token("c1", Duration::from_secs(120), true)
            .await
            .unwrap();
        assert!(second.refresh_token.is_some());

        let tokens = storage.client_tokens("c1").await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token, first.token);
        assert_eq!(tokens[0].expires, first.expires_at);
    }

    #[tokio::test]
    async fn test_expired_index_entries_are_pruned() {
        let (store, storage) = storage();
        let index = "oauth-data.api1-oauth-client-tokens.c1";

        store.add_to_sorted_set(index, "stale", 10.0).await.unwrap();
        storage
            .issue_token("c1", Duration::from_secs(60), false)
            .await
            .unwrap();

        let tokens = storage.client_tokens("c1").await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_ne!(tokens[0].token, "stale");

        let remaining = store
            .sorted_set_range(index, f64::NEG_INFINITY, f64::INFINITY)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination() {
        let (_, storage) = storage();
        for _ in 0..(TOKENS_PAGE_SIZE + 5) {
            storage
                .issue_token("c1", Duration::from_secs(60), false)
                .await
                .unwrap();
        }

        let (first, total) = storage.paginated_client_tokens("c1", 1).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(first.len(), TOKENS_PAGE_SIZE);

        let (second, _) = storage.paginated_client_tokens("c1", 2).await.unwrap();
        assert_eq!(second.len(), 5);

        let (beyond, _) = storage.paginated_client_tokens("c1", 3).await.unwrap();
        assert!(beyond.is_empty());

        let (far, total) = storage
            .paginated_client_tokens("c1", usize::MAX)
            .await
            .unwrap();
        assert!(far.is_empty());
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_revoke_with_hints() {
        let (_, storage) = storage();
        let access = storage
            .issue_token("c1", Duration::from_secs(60), true)
            .await
            .unwrap();
        let refresh = access.refresh_token.clone().unwrap();

        storage
            .revoke_token(&refresh, Some(TokenTypeHint::RefreshToken))
            .await
            .unwrap();
        assert!(storage.get_refresh(&refresh).await.unwrap().is_none());
        assert!(storage.get_access(&access.token).await.unwrap().is_some());

        storage.revoke_token(&access.token, None).await.unwrap();
        assert!(storage.get_access(&access.token).await.unwrap().is_none());
        assert!(storage.client_tokens("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_all_checks_secret() {
        let (_, storage) = storage();
        storage.set_client(&OAuthClient::new("c1", "s1")).await.unwrap();
        let a = storage
            .issue_token("c1", Duration::from_secs(60), true)
            .await
            .unwrap();
        let b = storage
            .issue_token("c1", Duration::from_secs(60), false)
            .await
            .unwrap();

        let err = storage.revoke_all_tokens("c1", "wrong").await.unwrap_err();
        assert_eq!(err, DomainError::unauthorized("client secret is wrong"));
        assert_eq!(storage.client_tokens("c1").await.unwrap().len(), 2);

        let mut revoked = storage.revoke_all_tokens("c1", "s1").await.unwrap();
        revoked.sort();
        let mut expected = vec![a.token.clone(), b.token.clone()];
        expected.sort();
        assert_eq!(revoked, expected);

        assert!(storage.get_access(&a.token).await.unwrap().is_none());
        assert!(storage
            .get_refresh(a.refresh_token.as_deref().unwrap())
            .await
            .unwrap()
            .is_none());
        assert!(storage.client_tokens("c1").await.unwrap().is_empty());
    }
}
