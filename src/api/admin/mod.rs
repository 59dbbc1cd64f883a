//! Admin API endpoints
//!
//! Every handler takes `RequireAdmin`, so a request without the shared
//! secret never reaches a service.

pub mod apis;
pub mod keys;
pub mod oauth;
pub mod orgs;
pub mod policies;
pub mod reload;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::state::AppState;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        // Keys
        .route("/keys", get(keys::list_keys).post(keys::create_key))
        .route("/keys/create", post(keys::create_key))
        .route("/keys/preview", post(keys::preview_key))
        .route("/keys/policy/{key}", put(keys::update_key_policies))
        .route(
            "/keys/{key}",
            get(keys::get_key)
                .post(keys::create_named_key)
                .put(keys::update_key)
                .delete(keys::delete_key),
        )
        // Policies
        .route(
            "/policies",
            get(policies::list_policies).post(policies::create_policy),
        )
        .route(
            "/policies/{policy_id}",
            get(policies::get_policy)
                .post(policies::create_policy)
                .put(policies::update_policy)
                .delete(policies::delete_policy),
        )
        // API definitions
        .route("/apis", get(apis::list_apis).post(apis::create_api))
        .route(
            "/apis/{api_id}",
            get(apis::get_api)
                .post(apis::create_api)
                .put(apis::update_api)
                .delete(apis::delete_api),
        )
        // OAuth clients and tokens
        .route("/oauth/clients/create", post(oauth::create_client))
        .route(
            "/oauth/clients/apis/{id}",
            get(oauth::client_apis).post(oauth::create_client_for_api),
        )
        .route("/oauth/clients/{api_id}", get(oauth::list_clients))
        .route(
            "/oauth/clients/{api_id}/{client_id}",
            get(oauth::get_client)
                .put(oauth::update_client)
                .delete(oauth::delete_client),
        )
        .route(
            "/oauth/clients/{api_id}/{client_id}/rotate",
            put(oauth::rotate_client),
        )
        .route(
            "/oauth/clients/{api_id}/{client_id}/tokens",
            get(oauth::client_tokens),
        )
        .route("/oauth/refresh/{token}", delete(oauth::invalidate_refresh))
        .route("/oauth/revoke", post(oauth::revoke_token))
        .route("/oauth/revoke_all", post(oauth::revoke_all_tokens))
        // Reloads
        .route("/reload", get(reload::reload).post(reload::reload))
        .route(
            "/reload/group",
            get(reload::group_reload).post(reload::group_reload),
        )
        // Org sessions
        .route("/orgs", get(orgs::list_orgs))
        .route(
            "/orgs/{org_id}",
            get(orgs::get_org)
                .post(orgs::create_org)
                .put(orgs::update_org)
                .delete(orgs::delete_org),
        )
}
