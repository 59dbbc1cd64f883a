//! Key (session) management endpoints

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::debug;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, KeyListResponse, ModifyResponse};
use crate::domain::{KeyChange, KeyRequestContext, SessionState};

/// Query parameters shared by the `/keys/{key}` routes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyQuery {
    pub api_id: String,
    pub org_id: String,
    /// Any non-empty value means the path carries the key hash
    pub hashed: String,
    /// `true` means the path carries a user name rather than a key
    pub username: String,
    pub suppress_reset: String,
    pub filter: String,
}

impl KeyQuery {
    fn is_hashed(&self) -> bool {
        !self.hashed.is_empty()
    }

    fn suppress_reset(&self) -> bool {
        self.suppress_reset == "1"
    }

    fn is_username(&self) -> bool {
        self.username == "true"
    }
}

/// Body of `PUT /keys/policy/{key}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyUpdateRequest {
    pub policy: String,
    pub apply_policies: Vec<String>,
}

/// Key addressed by the request, plus the raw path name to retry with when
/// no key is stored under the user-name token
fn resolve_key_name(state: &AppState, key: &str, query: &KeyQuery) -> (String, Option<String>) {
    if !query.is_username() {
        return (key.to_string(), None);
    }

    let identity = state.keys.identity();
    let token = identity.generate_token(&query.org_id, key);
    let fallback = (identity.hash_function().is_some() && token != key).then(|| key.to_string());
    (token, fallback)
}

pub async fn list_keys(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<KeyQuery>,
) -> Result<Json<KeyListResponse>, ApiError> {
    debug!(filter = %query.filter, "Listing keys");

    let keys = state.keys.list(&query.filter).await?;
    Ok(Json(KeyListResponse { keys }))
}

pub async fn get_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<SessionState>, ApiError> {
    let (name, fallback) = resolve_key_name(&state, &key, &query);
    let hashed = query.is_hashed();

    let result = state
        .keys
        .get_detail(&name, &query.api_id, &query.org_id, hashed)
        .await;

    let session = match (result, fallback) {
        (Err(e), Some(legacy)) if e.is_not_found() => {
            state
                .keys
                .get_detail(&legacy, &query.api_id, &query.org_id, hashed)
                .await?
        }
        (result, _) => result?,
    };

    Ok(Json(session))
}

/// `POST /keys/{key}`: create a key with a caller-chosen name
pub async fn create_named_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(session): Json<SessionState>,
) -> Result<Json<ModifyResponse>, ApiError> {
    debug!(org_id = %session.org_id, "Adding key with explicit name");

    let ctx = KeyRequestContext::create()
        .with_org(query.org_id.clone())
        .with_api(query.api_id.clone())
        .hashed(query.is_hashed())
        .suppress_reset(query.suppress_reset());

    let change = state.keys.add_or_update(&key, session, &ctx).await?;
    Ok(Json(change.into()))
}

pub async fn update_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(session): Json<SessionState>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let (name, fallback) = resolve_key_name(&state, &key, &query);

    let ctx = KeyRequestContext::update()
        .with_org(query.org_id.clone())
        .with_api(query.api_id.clone())
        .hashed(query.is_hashed())
        .suppress_reset(query.suppress_reset());

    let result = state.keys.add_or_update(&name, session.clone(), &ctx).await;
    let change = match (result, fallback) {
        (Err(e), Some(legacy)) if e.is_not_found() => {
            state.keys.add_or_update(&legacy, session, &ctx).await?
        }
        (result, _) => result?,
    };

    Ok(Json(change.into()))
}

pub async fn delete_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let (name, fallback) = resolve_key_name(&state, &key, &query);
    let hashed = query.is_hashed();

    let result = state
        .keys
        .delete(&name, &query.org_id, &query.api_id, hashed)
        .await;

    let change: KeyChange = match (result, fallback) {
        (Err(e), Some(legacy)) if e.is_not_found() => {
            state
                .keys
                .delete(&legacy, &query.org_id, &query.api_id, hashed)
                .await?
        }
        (result, _) => result?,
    };

    Ok(Json(change.into()))
}

/// `POST /keys/create`: issue a key with a generated name
pub async fn create_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(session): Json<SessionState>,
) -> Result<Json<ModifyResponse>, ApiError> {
    debug!(org_id = %session.org_id, "Creating generated key");

    let change = state.keys.create_generated(session).await?;
    Ok(Json(change.into()))
}

/// `POST /keys/preview`: the session a payload would produce
pub async fn preview_key(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(session): Json<SessionState>,
) -> Result<Json<SessionState>, ApiError> {
    let session = state.keys.preview(session)?;
    Ok(Json(session))
}

/// `PUT /keys/policy/{key}`: replace the policies of a hashed key
pub async fn update_key_policies(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(key_hash): Path<String>,
    Json(request): Json<PolicyUpdateRequest>,
) -> Result<Json<ModifyResponse>, ApiError> {
    let change = state
        .keys
        .update_hashed_key_policies(&key_hash, &request.policy, request.apply_policies)
        .await?;

    Ok(Json(change.into()))
}
