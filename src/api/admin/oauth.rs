//! OAuth client and token endpoints

use axum::extract::{Form, Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ModifyResponse, StatusMessage};
use crate::domain::OAuthClient;
use crate::infrastructure::oauth::{ClientRegistration, ClientUpdate};

/// Client as shown to admins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResponse {
    pub client_id: String,
    pub secret: String,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub policy_id: String,
    pub meta_data: Value,
    pub description: String,
}

impl ClientResponse {
    fn new(client: OAuthClient, api_id: impl Into<String>) -> Self {
        Self {
            client_id: client.client_id,
            secret: client.secret,
            redirect_uri: client.redirect_uri,
            api_id: api_id.into(),
            policy_id: client.policy_id,
            meta_data: client.meta_data,
            description: client.description,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokensQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientApisQuery {
    #[serde(rename = "orgID")]
    pub org_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshQuery {
    pub api_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RevokeForm {
    pub token: String,
    pub token_type_hint: String,
    pub client_id: String,
    pub org_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RevokeAllForm {
    pub client_id: String,
    pub client_secret: String,
    pub org_id: String,
}

/// `POST /oauth/clients/create`; the body picks the API or the policy
pub async fn create_client(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(registration): Json<ClientRegistration>,
) -> Result<Json<ClientResponse>, ApiError> {
    let api_id = registration.api_id.clone();
    let client = state.oauth.create(registration).await?;
    Ok(Json(ClientResponse::new(client, api_id)))
}

/// `POST /oauth/clients/apis/{api_id}`; the path picks the API
pub async fn create_client_for_api(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(api_id): Path<String>,
    Json(mut registration): Json<ClientRegistration>,
) -> Result<Json<ClientResponse>, ApiError> {
    registration.api_id = api_id.clone();
    let client = state.oauth.create(registration).await?;
    Ok(Json(ClientResponse::new(client, api_id)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(api_id): Path<String>,
) -> Result<Json<Vec<ClientResponse>>, ApiError> {
    let clients = state
        .oauth
        .list(&api_id)
        .await?
        .into_iter()
        .map(|client| ClientResponse::new(client, api_id.as_str()))
        .collect();

    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((api_id, client_id)): Path<(String, String)>,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state.oauth.get(&api_id, &client_id).await?;
    Ok(Json(ClientResponse::new(client, api_id)))
}

pub async fn update_client(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((api_id, client_id)): Path<(String, String)>,
    Json(update): Json<ClientUpdate>,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state.oauth.update(&api_id, &client_id, update).await?;
    Ok(Json(ClientResponse::new(client, api_id)))
}

pub async fn rotate_client(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((api_id, client_id)): Path<(String, String)>,
) -> Result<Json<ClientResponse>, ApiError> {
    let client = state.oauth.rotate(&api_id, &client_id).await?;
    Ok(Json(ClientResponse::new(client, api_id)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((api_id, client_id)): Path<(String, String)>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let change = state.oauth.delete(&api_id, &client_id).await?;
    Ok(Json(change.into()))
}

/// Live tokens of a client; `?page=N` switches to the paginated body
pub async fn client_tokens(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((api_id, client_id)): Path<(String, String)>,
    Query(query): Query<TokensQuery>,
) -> Result<Response, ApiError> {
    match query.page {
        Some(page) => {
            let page = page.parse::<usize>().unwrap_or(1);
            let tokens = state
                .oauth
                .client_tokens_page(&api_id, &client_id, page)
                .await?;
            Ok(Json(tokens).into_response())
        }
        None => {
            let tokens = state.oauth.client_tokens(&api_id, &client_id).await?;
            Ok(Json(tokens).into_response())
        }
    }
}

/// `GET /oauth/clients/apis/{client_id}?orgID=`
pub async fn client_apis(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(client_id): Path<String>,
    Query(query): Query<ClientApisQuery>,
) -> Json<Vec<String>> {
    debug!(client_id = %client_id, org_id = %query.org_id, "Looking up APIs of OAuth client");
    Json(state.oauth.apis_for_client(&client_id, &query.org_id).await)
}

/// `DELETE /oauth/refresh/{token}?api_id=`
pub async fn invalidate_refresh(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(token): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let change = state.oauth.invalidate_refresh(&query.api_id, &token).await?;
    Ok(Json(change.into()))
}

pub async fn revoke_token(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Form(form): Form<RevokeForm>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .oauth
        .revoke_token(&form.token, &form.client_id, &form.org_id, &form.token_type_hint)
        .await?;

    Ok(Json(StatusMessage::ok("token revoked successfully")))
}

pub async fn revoke_all_tokens(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Form(form): Form<RevokeAllForm>,
) -> Result<Json<StatusMessage>, ApiError> {
    state
        .oauth
        .revoke_all(&form.client_id, &form.client_secret, &form.org_id)
        .await?;

    Ok(Json(StatusMessage::ok("tokens revoked successfully")))
}
