//! OAuth client registry: registration fan-out, rotation, updates and
//! token revocation across APIs

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::storage::{OAuthStorage, TOKENS_PAGE_SIZE};
use crate::domain::notification::{Notification, NotificationBus};
use crate::domain::oauth::{ClientToken, OAuthClient, TokenTypeHint};
use crate::domain::session::{KeyAction, KeyChange};
use crate::domain::storage::KeyValueStore;
use crate::domain::{ApiDefinition, DomainError};
use crate::infrastructure::logging::obfuscate_key;
use crate::infrastructure::registry::ConfigRegistry;
use crate::infrastructure::session::KeyGenerator;

/// Registration payload; empty ID or secret are generated
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientRegistration {
    pub client_id: String,
    pub secret: String,
    pub redirect_uri: String,
    pub policy_id: String,
    pub meta_data: Value,
    pub description: String,
    pub api_id: String,
}

/// Mutable client fields; the secret only changes through rotation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientUpdate {
    pub redirect_uri: String,
    pub policy_id: String,
    pub meta_data: Value,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page_size: usize,
    pub page_num: usize,
    pub page_total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPage {
    #[serde(rename = "Pagination")]
    pub pagination: Pagination,
    #[serde(rename = "Tokens")]
    pub tokens: Vec<ClientToken>,
}

#[derive(Clone)]
pub struct OAuthClientRegistry {
    store: Arc<dyn KeyValueStore>,
    registry: Arc<ConfigRegistry>,
    generator: Arc<dyn KeyGenerator>,
    bus: Arc<dyn NotificationBus>,
    node_id: String,
}

impl fmt::Debug for OAuthClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientRegistry")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}

impl OAuthClientRegistry {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        registry: Arc<ConfigRegistry>,
        generator: Arc<dyn KeyGenerator>,
        bus: Arc<dyn NotificationBus>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            generator,
            bus,
            node_id: node_id.into(),
        }
    }

    pub fn storage(&self, api_id: &str) -> OAuthStorage {
        OAuthStorage::for_api(self.store.clone(), api_id)
    }

    /// Register a client on one API, or on every OAuth-capable API its
    /// policy grants
    ///
    /// A storage failure part way through leaves the APIs already written.
    pub async fn create(&self, request: ClientRegistration) -> Result<OAuthClient, DomainError> {
        let client = OAuthClient {
            client_id: if request.client_id.is_empty() {
                self.generator.generate_client_id()
            } else {
                request.client_id
            },
            secret: if request.secret.is_empty() {
                self.generator.generate_client_secret()
            } else {
                request.secret
            },
            redirect_uri: request.redirect_uri,
            policy_id: request.policy_id,
            meta_data: request.meta_data,
            description: request.description,
        };

        if !request.api_id.is_empty() {
            let api = self.registry.api(&request.api_id).ok_or_else(|| {
                error!(api_id = %request.api_id, status = "fail", "Failed to create OAuth client, API doesn't exist");
                DomainError::validation("API doesn't exist")
            })?;

            if !api.use_oauth2 {
                return Err(DomainError::validation("API is not OAuth2"));
            }

            self.store_client(&api.api_id, &client).await?;
        } else {
            let policy = self.registry.policy(&client.policy_id).ok_or_else(|| {
                error!(policy_id = %client.policy_id, status = "fail", "Failed to create OAuth client, policy doesn't exist");
                DomainError::validation("Policy doesn't exist")
            })?;

            let mut registered = false;
            for api_id in policy.access_rights.keys() {
                let api = self.registry.api(api_id).ok_or_else(|| {
                    error!(api_id = %api_id, status = "fail", "Failed to create OAuth client, API doesn't exist");
                    DomainError::validation("API doesn't exist")
                })?;

                if api.accepts_oauth_clients() {
                    self.store_client(&api.api_id, &client).await?;
                    registered = true;
                }
            }

            if !registered {
                return Err(DomainError::validation("API is not OAuth2"));
            }
        }

        info!(
            api_id = %request.api_id,
            client_id = %client.client_id,
            policy_id = %client.policy_id,
            status = "ok",
            "Created OAuth client"
        );
        Ok(client)
    }

    async fn store_client(&self, api_id: &str, client: &OAuthClient) -> Result<(), DomainError> {
        self.storage(api_id).set_client(client).await.map_err(|e| {
            error!(api_id = %api_id, error = %e, status = "fail", "Failed to store OAuth client");
            DomainError::storage("Failure in storing client data.")
        })
    }

    fn api(&self, api_id: &str, missing: &str) -> Result<Arc<ApiDefinition>, DomainError> {
        self.registry.api(api_id).ok_or_else(|| {
            error!(api_id = %api_id, status = "fail", "API not found");
            DomainError::not_found(missing)
        })
    }

    async fn existing_client(
        &self,
        storage: &OAuthStorage,
        client_id: &str,
    ) -> Result<OAuthClient, DomainError> {
        storage
            .get_client(client_id)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| DomainError::not_found("OAuth Client ID not found"))
    }

    async fn replace_client(
        &self,
        storage: &OAuthStorage,
        previous: &OAuthClient,
        updated: OAuthClient,
    ) -> Result<OAuthClient, DomainError> {
        storage.set_client(&updated).await.map_err(|e| {
            error!(api_id = %storage.api_id(), error = %e, status = "fail", "Failed to update OAuth client");
            DomainError::storage("Failure in storing client data")
        })?;

        self.invalidate_tokens(storage, previous, &updated).await;
        Ok(updated)
    }

    /// New secret, everything else kept
    pub async fn rotate(&self, api_id: &str, client_id: &str) -> Result<OAuthClient, DomainError> {
        self.api(api_id, "API doesn't exist")?;
        let storage = self.storage(api_id);
        let previous = self.existing_client(&storage, client_id).await?;

        let updated = OAuthClient {
            secret: self.generator.generate_client_secret(),
            ..previous.clone()
        };

        let updated = self.replace_client(&storage, &previous, updated).await?;
        info!(api_id = %api_id, client_id = %client_id, status = "ok", "Rotated OAuth client secret");
        Ok(updated)
    }

    pub async fn update(
        &self,
        api_id: &str,
        client_id: &str,
        update: ClientUpdate,
    ) -> Result<OAuthClient, DomainError> {
        self.api(api_id, "API doesn't exist")?;

        if !update.policy_id.is_empty() {
            let policy = self
                .registry
                .policy(&update.policy_id)
                .ok_or_else(|| DomainError::not_found("Policy doesn't exist"))?;

            if !policy.covers_api(api_id) {
                return Err(DomainError::validation(
                    "Policy access rights doesn't contain API this OAuth client belongs to",
                ));
            }
        }

        let storage = self.storage(api_id);
        let previous = self.existing_client(&storage, client_id).await?;

        let updated = OAuthClient {
            client_id: previous.client_id.clone(),
            secret: previous.secret.clone(),
            redirect_uri: update.redirect_uri,
            policy_id: update.policy_id,
            meta_data: update.meta_data,
            description: update.description,
        };

        let updated = self.replace_client(&storage, &previous, updated).await?;
        info!(api_id = %api_id, client_id = %client_id, status = "ok", "Updated OAuth client");
        Ok(updated)
    }

    /// Revoke every access token of the client when its policy moved
    pub async fn invalidate_tokens(
        &self,
        storage: &OAuthStorage,
        previous: &OAuthClient,
        updated: &OAuthClient,
    ) {
        if !updated.policy_changed_from(previous) {
            return;
        }

        let tokens = match storage.client_tokens(&updated.client_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Could not get list of tokens for updated OAuth client");
                return;
            }
        };

        for token in tokens {
            if let Err(e) = storage.remove_access(&token.token).await {
                warn!(error = %e, "Could not remove token for updated OAuth client policy");
            }
        }

        info!(
            api_id = %storage.api_id(),
            client_id = %updated.client_id,
            "Revoked OAuth client tokens after policy change"
        );
    }

    pub async fn get(&self, api_id: &str, client_id: &str) -> Result<OAuthClient, DomainError> {
        self.api(api_id, "OAuth Client ID not found")?;
        let client = self.existing_client(&self.storage(api_id), client_id).await?;

        info!(api_id = %api_id, client_id = %client_id, status = "ok", "Retrieved OAuth client ID");
        Ok(client)
    }

    pub async fn delete(&self, api_id: &str, client_id: &str) -> Result<KeyChange, DomainError> {
        let api = self.api(api_id, "OAuth Client ID not found")?;
        if !api.accepts_oauth_clients() {
            return Err(DomainError::not_found("OAuth Client ID not found"));
        }

        self.storage(api_id)
            .delete_client(client_id)
            .await
            .map_err(|_| DomainError::storage("Delete failed"))?;

        info!(api_id = %api_id, client_id = %client_id, status = "ok", "Deleted OAuth client");
        Ok(KeyChange::new(client_id, KeyAction::Deleted))
    }

    /// Clients of an API; empty for APIs without OAuth2
    pub async fn list(&self, api_id: &str) -> Result<Vec<OAuthClient>, DomainError> {
        let api = self.api(api_id, "OAuth client not found")?;
        if !api.use_oauth2 {
            return Ok(Vec::new());
        }

        let clients = self.storage(api_id).list_clients().await.map_err(|e| {
            error!(api_id = %api_id, error = %e, status = "fail", "Failed to report OAuth client list");
            DomainError::not_found("OAuth client not found")
        })?;

        info!(api_id = %api_id, status = "ok", "Retrieved OAuth client list");
        Ok(clients)
    }

    pub async fn client_tokens(
        &self,
        api_id: &str,
        client_id: &str,
    ) -> Result<Vec<ClientToken>, DomainError> {
        self.api(api_id, "OAuth Client ID not found")?;
        self.storage(api_id)
            .client_tokens(client_id)
            .await
            .map_err(|_| DomainError::storage("Get client tokens failed"))
    }

    pub async fn client_tokens_page(
        &self,
        api_id: &str,
        client_id: &str,
        page: usize,
    ) -> Result<TokenPage, DomainError> {
        self.api(api_id, "OAuth Client ID not found")?;
        let page = page.max(1);

        let (tokens, page_total) = self
            .storage(api_id)
            .paginated_client_tokens(client_id, page)
            .await
            .map_err(|_| DomainError::storage("Get client tokens failed"))?;

        Ok(TokenPage {
            pagination: Pagination {
                page_size: TOKENS_PAGE_SIZE,
                page_num: page,
                page_total,
            },
            tokens,
        })
    }

    /// OAuth2 APIs of `org_id` that have `client_id` registered
    pub async fn apis_for_client(&self, client_id: &str, org_id: &str) -> Vec<String> {
        let mut apis = Vec::new();

        for api_id in self.registry.api_ids_for_org(org_id) {
            let Some(api) = self.registry.api(&api_id) else {
                continue;
            };
            if !api.use_oauth2 {
                continue;
            }

            match self.storage(&api_id).get_client(client_id).await {
                Ok(Some(_)) => apis.push(api_id),
                Ok(None) => {}
                Err(e) => warn!(api_id = %api_id, error = %e, "Could not read OAuth client"),
            }
        }

        apis
    }

    /// Revoke one token on every API the client is registered on
    pub async fn revoke_token(
        &self,
        token: &str,
        client_id: &str,
        org_id: &str,
        token_type_hint: &str,
    ) -> Result<(), DomainError> {
        if token.is_empty() {
            return Err(DomainError::validation("token is required"));
        }
        if client_id.is_empty() {
            return Err(DomainError::validation("client_id is required"));
        }

        let apis = self.apis_for_client(client_id, org_id).await;
        if apis.is_empty() {
            return Err(DomainError::validation("oauth client doesn't exist"));
        }

        let hint = TokenTypeHint::parse(token_type_hint);
        for api_id in apis {
            if let Err(e) = self.storage(&api_id).revoke_token(token, hint).await {
                warn!(api_id = %api_id, error = %e, "Could not revoke token");
            }
        }

        info!(token = %obfuscate_key(token), client_id = %client_id, status = "ok", "Token revoked");
        Ok(())
    }

    /// Revoke every token of a client on every API it is registered on and
    /// tell the fleet which tokens went
    pub async fn revoke_all(
        &self,
        client_id: &str,
        secret: &str,
        org_id: &str,
    ) -> Result<Vec<String>, DomainError> {
        if client_id.is_empty() {
            return Err(DomainError::unauthorized("client_id is required"));
        }
        if secret.is_empty() {
            return Err(DomainError::unauthorized("client_secret is required"));
        }

        let apis = self.apis_for_client(client_id, org_id).await;
        if apis.is_empty() {
            return Err(DomainError::not_found("oauth client doesn't exist"));
        }

        let mut revoked = Vec::new();
        for api_id in apis {
            match self.storage(&api_id).revoke_all_tokens(client_id, secret).await {
                Ok(tokens) => revoked.extend(tokens),
                Err(e) => warn!(api_id = %api_id, error = %e, "Could not revoke client tokens"),
            }
        }

        let notification = Notification::key_space_updated(&revoked, self.node_id.clone());
        if let Err(e) = self.bus.publish(notification).await {
            warn!(error = %e, "Could not publish key space update");
        }

        info!(client_id = %client_id, count = revoked.len(), status = "ok", "Tokens revoked");
        Ok(revoked)
    }

    pub async fn invalidate_refresh(&self, api_id: &str, token: &str) -> Result<KeyChange, DomainError> {
        if api_id.is_empty() {
            return Err(DomainError::validation("Missing parameter api_id"));
        }

        let api = self.api(api_id, "API for this refresh token not found")?;
        if !api.accepts_oauth_clients() {
            error!(api_id = %api_id, status = "fail", "Failed to invalidate refresh token, API is not OAuth");
            return Err(DomainError::validation("OAuth is not enabled on this API"));
        }

        self.storage(api_id).remove_refresh(token).await.map_err(|e| {
            error!(api_id = %api_id, error = %e, status = "fail", "Failed to invalidate refresh token");
            DomainError::storage("Failed to invalidate refresh token")
        })?;

        info!(api_id = %api_id, token = %obfuscate_key(token), status = "ok", "Invalidated refresh token");
        Ok(KeyChange::new(token, KeyAction::Deleted))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::notification::{MockNotificationBus, NotificationCommand};
    use crate::domain::policy::Policy;
    use crate::domain::session::AccessDefinition;
    use crate::infrastructure::kv::InMemoryStore;
    use crate::infrastructure::notifier::InMemoryBus;
    use crate::infrastructure::session::{KeyIdentity, SequentialKeyGenerator};

    fn registry_with(bus: Arc<dyn NotificationBus>) -> OAuthClientRegistry {
        let apis = vec![
            ApiDefinition::new("oauth-api", "org1", "/oauth/").with_oauth2(true),
            ApiDefinition::new("jwt-api", "org1", "/jwt/").with_jwt(true),
            ApiDefinition::new("plain-api", "org1", "/plain/"),
        ];
        let policies = vec![
            Policy::new("p-oauth", "org1")
                .with_access_right("oauth-api", AccessDefinition::new("oauth-api"))
                .with_access_right("plain-api", AccessDefinition::new("plain-api")),
            Policy::new("p-plain", "org1")
                .with_access_right("plain-api", AccessDefinition::new("plain-api")),
            Policy::new("p-other", "org1")
                .with_access_right("oauth-api", AccessDefinition::new("oauth-api")),
            Policy::new("p-ghost", "org1")
                .with_access_right("ghost", AccessDefinition::new("ghost")),
        ];

        OAuthClientRegistry::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(ConfigRegistry::from_definitions(apis, policies)),
            Arc::new(SequentialKeyGenerator::new(KeyIdentity::plain())),
            bus,
            "node-a",
        )
    }

    fn registry() -> OAuthClientRegistry {
        registry_with(Arc::new(InMemoryBus::new()))
    }

    fn registration(api_id: &str, policy_id: &str) -> ClientRegistration {
        ClientRegistration {
            api_id: api_id.to_string(),
            policy_id: policy_id.to_string(),
            redirect_uri: "http://app.example/cb".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_for_single_api() {
        let oauth = registry();

        let client = oauth.create(registration("oauth-api", "")).await.unwrap();
        assert_eq!(client.client_id, "client-1");
        assert_eq!(client.secret, "secret-2");
        assert_eq!(oauth.get("oauth-api", "client-1").await.unwrap(), client);

        let err = oauth.create(registration("plain-api", "")).await.unwrap_err();
        assert_eq!(err, DomainError::validation("API is not OAuth2"));

        let err = oauth.create(registration("ghost", "")).await.unwrap_err();
        assert_eq!(err, DomainError::validation("API doesn't exist"));
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_credentials() {
        let oauth = registry();
        let mut request = registration("oauth-api", "");
        request.client_id = "mine".to_string();
        request.secret = "shh".to_string();

        let client = oauth.create(request).await.unwrap();
        assert_eq!(client.client_id, "mine");
        assert_eq!(client.secret, "shh");
    }

    #[tokio::test]
    async fn test_create_fans_out_through_policy() {
        let oauth = registry();

        let client = oauth.create(registration("", "p-oauth")).await.unwrap();
        assert!(oauth.storage("oauth-api").get_client(&client.client_id).await.unwrap().is_some());
        assert!(oauth.storage("plain-api").get_client(&client.client_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_through_policy_without_oauth_api() {
        let oauth = registry();

        let err = oauth.create(registration("", "p-plain")).await.unwrap_err();
        assert_eq!(err, DomainError::validation("API is not OAuth2"));

        let err = oauth.create(registration("", "missing")).await.unwrap_err();
        assert_eq!(err, DomainError::validation("Policy doesn't exist"));

        let err = oauth.create(registration("", "p-ghost")).await.unwrap_err();
        assert_eq!(err, DomainError::validation("API doesn't exist"));
    }

    #[tokio::test]
    async fn test_rotate_keeps_tokens() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "p-oauth")).await.unwrap();
        oauth
            .storage("oauth-api")
            .issue_token(&client.client_id, Duration::from_secs(60), false)
            .await
            .unwrap();

        let rotated = oauth.rotate("oauth-api", &client.client_id).await.unwrap();
        assert_ne!(rotated.secret, client.secret);
        assert_eq!(rotated.redirect_uri, client.redirect_uri);
        assert_eq!(rotated.policy_id, client.policy_id);

        let tokens = oauth.client_tokens("oauth-api", &client.client_id).await.unwrap();
        assert_eq!(tokens.len(), 1);

        let err = oauth.rotate("oauth-api", "nobody").await.unwrap_err();
        assert_eq!(err, DomainError::not_found("OAuth Client ID not found"));
        let err = oauth.rotate("ghost", &client.client_id).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("API doesn't exist"));
    }

    #[tokio::test]
    async fn test_policy_change_revokes_tokens() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "p-oauth")).await.unwrap();
        let storage = oauth.storage("oauth-api");
        let token = storage
            .issue_token(&client.client_id, Duration::from_secs(60), false)
            .await
            .unwrap();

        let updated = oauth
            .update(
                "oauth-api",
                &client.client_id,
                ClientUpdate {
                    policy_id: "p-other".to_string(),
                    description: "moved".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.secret, client.secret);
        assert_eq!(updated.description, "moved");
        assert!(storage.get_access(&token.token).await.unwrap().is_none());
        assert!(oauth.client_tokens("oauth-api", &client.client_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_validates_policy() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "p-oauth")).await.unwrap();

        let err = oauth
            .update(
                "oauth-api",
                &client.client_id,
                ClientUpdate {
                    policy_id: "p-plain".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "Policy access rights doesn't contain API this OAuth client belongs to"
            )
        );

        let err = oauth
            .update(
                "oauth-api",
                &client.client_id,
                ClientUpdate {
                    policy_id: "missing".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("Policy doesn't exist"));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "")).await.unwrap();

        let clients = oauth.list("oauth-api").await.unwrap();
        assert_eq!(clients, vec![client.clone()]);
        assert!(oauth.list("plain-api").await.unwrap().is_empty());
        assert!(oauth.list("ghost").await.unwrap_err().is_not_found());

        let change = oauth.delete("oauth-api", &client.client_id).await.unwrap();
        assert_eq!(change.action, KeyAction::Deleted);
        assert!(oauth.list("oauth-api").await.unwrap().is_empty());

        let err = oauth.delete("plain-api", &client.client_id).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("OAuth Client ID not found"));
    }

    #[tokio::test]
    async fn test_token_page() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "")).await.unwrap();
        oauth
            .storage("oauth-api")
            .issue_token(&client.client_id, Duration::from_secs(60), false)
            .await
            .unwrap();

        let page = oauth
            .client_tokens_page("oauth-api", &client.client_id, 0)
            .await
            .unwrap();
        assert_eq!(
            page.pagination,
            Pagination {
                page_size: 100,
                page_num: 1,
                page_total: 1
            }
        );
        assert_eq!(page.tokens.len(), 1);

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["Pagination"]["page_num"], 1);
        assert!(json["Tokens"].is_array());
    }

    #[tokio::test]
    async fn test_apis_for_client() {
        let oauth = registry();
        let client = oauth.create(registration("", "p-oauth")).await.unwrap();

        assert_eq!(
            oauth.apis_for_client(&client.client_id, "org1").await,
            vec!["oauth-api".to_string()]
        );
        assert!(oauth.apis_for_client(&client.client_id, "org2").await.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "")).await.unwrap();
        let token = oauth
            .storage("oauth-api")
            .issue_token(&client.client_id, Duration::from_secs(60), false)
            .await
            .unwrap();

        assert_eq!(
            oauth.revoke_token("", &client.client_id, "org1", "").await.unwrap_err(),
            DomainError::validation("token is required")
        );
        assert_eq!(
            oauth.revoke_token(&token.token, "", "org1", "").await.unwrap_err(),
            DomainError::validation("client_id is required")
        );
        assert_eq!(
            oauth.revoke_token(&token.token, "nobody", "org1", "").await.unwrap_err(),
            DomainError::validation("oauth client doesn't exist")
        );

        oauth
            .revoke_token(&token.token, &client.client_id, "org1", "access_token")
            .await
            .unwrap();
        assert!(oauth
            .storage("oauth-api")
            .get_access(&token.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_revoke_all_publishes_revoked_tokens() {
        let mut bus = MockNotificationBus::new();
        bus.expect_publish()
            .withf(|n| n.command == NotificationCommand::KeySpaceUpdated && !n.payload.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let oauth = registry_with(Arc::new(bus));
        let client = oauth.create(registration("oauth-api", "")).await.unwrap();
        let token = oauth
            .storage("oauth-api")
            .issue_token(&client.client_id, Duration::from_secs(60), false)
            .await
            .unwrap();

        let revoked = oauth
            .revoke_all(&client.client_id, &client.secret, "org1")
            .await
            .unwrap();
        assert_eq!(revoked, vec![token.token]);
    }

    #[tokio::test]
    async fn test_revoke_all_validation() {
        let oauth = registry();

        assert_eq!(
            oauth.revoke_all("", "s", "org1").await.unwrap_err(),
            DomainError::unauthorized("client_id is required")
        );
        assert_eq!(
            oauth.revoke_all("c", "", "org1").await.unwrap_err(),
            DomainError::unauthorized("client_secret is required")
        );
        assert_eq!(
            oauth.revoke_all("c", "s", "org1").await.unwrap_err(),
            DomainError::not_found("oauth client doesn't exist")
        );
    }

    #[tokio::test]
    async fn test_invalidate_refresh() {
        let oauth = registry();
        let client = oauth.create(registration("oauth-api", "")).await.unwrap();
        let token = oauth
            .storage("oauth-api")
            .issue_token(&client.client_id, Duration::from_secs(60), true)
            .await
            .unwrap();
        let refresh = token.refresh_token.unwrap();

        let change = oauth.invalidate_refresh("oauth-api", &refresh).await.unwrap();
        assert_eq!(change.key, refresh);
        assert!(oauth.storage("oauth-api").get_refresh(&refresh).await.unwrap().is_none());

        assert_eq!(
            oauth.invalidate_refresh("", &refresh).await.unwrap_err(),
            DomainError::validation("Missing parameter api_id")
        );
        assert_eq!(
            oauth.invalidate_refresh("ghost", &refresh).await.unwrap_err(),
            DomainError::not_found("API for this refresh token not found")
        );
        assert_eq!(
            oauth.invalidate_refresh("plain-api", &refresh).await.unwrap_err(),
            DomainError::validation("OAuth is not enabled on this API")
        );
    }
}
