use axum::{middleware, routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::{logging_middleware, security_headers_middleware};
use super::state::AppState;
use super::types::ApiError;

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        // Probes, no admin secret
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        // Admin API
        .merge(admin::create_admin_router())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::middleware::ADMIN_SECRET_HEADER;
    use crate::api::state::test_support::{context, context_with, TestContext, TEST_SECRET};
    use crate::domain::{AccessDefinition, ApiDefinition, Policy};
    use crate::infrastructure::notifier::NotificationListener;

    async fn send(
        ctx: &TestContext,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(ADMIN_SECRET_HEADER, TEST_SECRET);

        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = create_router_with_state(ctx.state.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn send_form(ctx: &TestContext, uri: &str, form: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(ADMIN_SECRET_HEADER, TEST_SECRET)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();

        let response = create_router_with_state(ctx.state.clone())
            .oneshot(request)
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn api1() -> ApiDefinition {
        ApiDefinition::new("api1", "org1", "/api1/")
    }

    #[tokio::test]
    async fn test_health_needs_no_secret() {
        let ctx = context(vec![], vec![]).await;

        let response = create_router_with_state(ctx.state.clone())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "pass");
    }

    #[tokio::test]
    async fn test_admin_routes_require_secret() {
        let ctx = context(vec![api1()], vec![]).await;

        for secret in [None, Some("wrong")] {
            let mut request = Request::builder().uri("/keys");
            if let Some(secret) = secret {
                request = request.header(ADMIN_SECRET_HEADER, secret);
            }

            let response = create_router_with_state(ctx.state.clone())
                .oneshot(request.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(
                body,
                json!({
                    "status": "error",
                    "message": "Attempted administrative access with invalid or missing key!"
                })
            );
        }
    }

    #[tokio::test]
    async fn test_create_key_then_read_quota() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/keys/create",
            Some(json!({"org_id": "org1", "access_rights": {"api1": {}}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["action"], "added");
        assert_eq!(body["key"], "org1key-1");
        assert!(body.get("key_hash").is_none());

        let (status, session) = send(&ctx, Method::GET, "/keys/org1key-1?api_id=api1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["org_id"], "org1");
        assert_eq!(session["quota_remaining"], session["quota_max"]);
        assert!(session["access_rights"].get("api1").is_some());
    }

    #[tokio::test]
    async fn test_create_key_with_quota_reports_full_allowance() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/keys/create",
            Some(json!({
                "org_id": "org1",
                "access_rights": {"api1": {}},
                "quota_max": 100,
                "quota_renewal_rate": 3600
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let key = body["key"].as_str().unwrap().to_string();
        let (_, session) = send(&ctx, Method::GET, &format!("/keys/{}", key), None).await;
        assert_eq!(session["quota_max"], 100);
        assert_eq!(session["quota_remaining"], 100);
    }

    #[tokio::test]
    async fn test_update_unknown_key_is_not_found() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::PUT,
            "/keys/bad-key",
            Some(json!({"org_id": "org1", "access_rights": {"api1": {}}})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"status": "error", "message": "Key is not found"}));
    }

    #[tokio::test]
    async fn test_key_lifecycle_over_http() {
        let ctx = context(vec![api1()], vec![]).await;
        let payload = json!({"org_id": "org1", "access_rights": {"api1": {}}});

        let (status, body) = send(&ctx, Method::POST, "/keys/my-key", Some(payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "added");
        assert_eq!(body["key"], "org1my-key");

        let (status, body) =
            send(&ctx, Method::PUT, "/keys/org1my-key?suppress_reset=1", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "modified");

        let (status, body) = send(&ctx, Method::GET, "/keys?filter=org1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keys"], json!(["org1my-key"]));

        let (status, body) = send(&ctx, Method::DELETE, "/keys/org1my-key", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "deleted");

        let (status, body) = send(&ctx, Method::DELETE, "/keys/org1my-key", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "There is no such key found");
    }

    #[tokio::test]
    async fn test_master_key_refused() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/keys/create",
            Some(json!({"org_id": "org1"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_hashed_lookup_without_hashing() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(&ctx, Method::GET, "/keys/abc?hashed=1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Key requested by hash but key hashing is not enabled"
        );
    }

    #[tokio::test]
    async fn test_hashed_listing_disabled() {
        let ctx = context_with(
            |gateway| {
                gateway.hash_keys = true;
                gateway.hash_key_function = "sha256".to_string();
            },
            vec![api1()],
            vec![],
        )
        .await;

        let (status, body) = send(&ctx, Method::GET, "/keys", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["message"],
            "Hashed key listing is disabled in config (enable_hashed_keys_listing)"
        );
    }

    #[tokio::test]
    async fn test_hashed_key_creation_reports_hash() {
        let ctx = context_with(
            |gateway| {
                gateway.hash_keys = true;
                gateway.hash_key_function = "sha256".to_string();
            },
            vec![api1()],
            vec![Policy::new("p1", "org1").with_access_right("api1", AccessDefinition::new("api1"))],
        )
        .await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/keys/create",
            Some(json!({"org_id": "org1", "access_rights": {"api1": {}}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let key_hash = body["key_hash"].as_str().unwrap().to_string();
        assert_eq!(key_hash.len(), 64);

        let (status, body) = send(
            &ctx,
            Method::PUT,
            &format!("/keys/policy/{}", key_hash),
            Some(json!({"policy": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "updated");

        let (status, session) =
            send(&ctx, Method::GET, &format!("/keys/{}?hashed=1", key_hash), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["apply_policies"], json!(["p1"]));
    }

    #[tokio::test]
    async fn test_username_update_keeps_non_lookup_errors() {
        let ctx = context_with(
            |gateway| {
                gateway.hash_keys = true;
                gateway.hash_key_function = "sha256".to_string();
            },
            vec![api1()],
            vec![],
        )
        .await;

        let (status, _) = send(
            &ctx,
            Method::POST,
            "/keys/alice",
            Some(json!({"org_id": "org1", "access_rights": {"api1": {}}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // The key is found by user name, so the certificate error stands
        let (status, body) = send(
            &ctx,
            Method::PUT,
            "/keys/alice?username=true&org_id=org1",
            Some(json!({
                "org_id": "org1",
                "certificate": "missing-cert",
                "access_rights": {"api1": {}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Key must be used with an existent certificate");

        let (status, body) = send(
            &ctx,
            Method::PUT,
            "/keys/nobody?username=true&org_id=org1",
            Some(json!({"org_id": "org1", "access_rights": {"api1": {}}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Key is not found");
    }

    #[tokio::test]
    async fn test_preview_does_not_persist() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/keys/preview",
            Some(json!({"org_id": "org1", "access_rights": {"api1": {}}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["org_id"], "org1");
        assert!(ctx.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let ctx = context(vec![api1()], vec![]).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/keys/create")
            .header(ADMIN_SECRET_HEADER, TEST_SECRET)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = create_router_with_state(ctx.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "error", "message": "Request malformed"}));
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let ctx = context(vec![], vec![]).await;

        let (status, body) = send(&ctx, Method::PATCH, "/keys", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["message"], "Method not supported");
    }

    #[tokio::test]
    async fn test_admin_responses_carry_secure_headers() {
        let ctx = context(vec![], vec![]).await;

        let request = Request::builder()
            .uri("/policies")
            .header(ADMIN_SECRET_HEADER, TEST_SECRET)
            .body(Body::empty())
            .unwrap();
        let response = create_router_with_state(ctx.state.clone())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["pragma"], "no-cache");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oauth_client_needs_oauth_api() {
        let policy =
            Policy::new("p1", "org1").with_access_right("api1", AccessDefinition::new("api1"));
        let ctx = context(vec![api1()], vec![policy]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/oauth/clients/create",
            Some(json!({"policy_id": "p1", "redirect_uri": "http://app.local/cb"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"status": "error", "message": "API is not OAuth2"}));
    }

    #[tokio::test]
    async fn test_oauth_policy_change_revokes_tokens() {
        let api = ApiDefinition::new("oauth-api", "org1", "/oauth/").with_oauth2(true);
        let p1 = Policy::new("p1", "org1")
            .with_access_right("oauth-api", AccessDefinition::new("oauth-api"));
        let p2 = Policy::new("p2", "org1")
            .with_access_right("oauth-api", AccessDefinition::new("oauth-api"));
        let ctx = context(vec![api], vec![p1, p2]).await;

        let (status, client) = send(
            &ctx,
            Method::POST,
            "/oauth/clients/apis/oauth-api",
            Some(json!({"policy_id": "p1", "redirect_uri": "http://app.local/cb"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let client_id = client["client_id"].as_str().unwrap().to_string();
        assert_eq!(client["api_id"], "oauth-api");

        let storage = ctx.state.oauth.storage("oauth-api");
        storage
            .issue_token(&client_id, Duration::from_secs(3600), false)
            .await
            .unwrap();

        let tokens_uri = format!("/oauth/clients/oauth-api/{}/tokens", client_id);
        let (_, tokens) = send(&ctx, Method::GET, &tokens_uri, None).await;
        assert_eq!(tokens.as_array().unwrap().len(), 1);

        // Rotation alone keeps tokens
        let (status, rotated) = send(
            &ctx,
            Method::PUT,
            &format!("/oauth/clients/oauth-api/{}/rotate", client_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(rotated["secret"], client["secret"]);
        let (_, tokens) = send(&ctx, Method::GET, &tokens_uri, None).await;
        assert_eq!(tokens.as_array().unwrap().len(), 1);

        let (status, updated) = send(
            &ctx,
            Method::PUT,
            &format!("/oauth/clients/oauth-api/{}", client_id),
            Some(json!({"policy_id": "p2", "redirect_uri": "http://app.local/cb"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["policy_id"], "p2");
        assert_eq!(updated["secret"], rotated["secret"]);

        let (_, tokens) = send(&ctx, Method::GET, &tokens_uri, None).await;
        assert!(tokens.as_array().unwrap().is_empty());

        let (_, page) = send(&ctx, Method::GET, &format!("{}?page=1", tokens_uri), None).await;
        assert_eq!(page["Pagination"]["page_size"], 100);
        assert_eq!(page["Pagination"]["page_num"], 1);

        let (status, page) = send(
            &ctx,
            Method::GET,
            &format!("{}?page=18446744073709551615", tokens_uri),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["Tokens"], json!([]));
    }

    #[tokio::test]
    async fn test_oauth_revoke_forms() {
        let api = ApiDefinition::new("oauth-api", "org1", "/oauth/").with_oauth2(true);
        let ctx = context(vec![api], vec![]).await;

        let (_, client) = send(
            &ctx,
            Method::POST,
            "/oauth/clients/apis/oauth-api",
            Some(json!({"client_id": "app", "secret": "s3cret"})),
        )
        .await;
        assert_eq!(client["client_id"], "app");

        let (status, apis) = send(&ctx, Method::GET, "/oauth/clients/apis/app?orgID=org1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(apis, json!(["oauth-api"]));

        let storage = ctx.state.oauth.storage("oauth-api");
        let token = storage
            .issue_token("app", Duration::from_secs(3600), true)
            .await
            .unwrap();

        let (status, body) = send_form(
            &ctx,
            "/oauth/revoke",
            &format!("token={}&client_id=app&org_id=org1&token_type_hint=access_token", token.token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(storage.get_access(&token.token).await.unwrap().is_none());

        let (status, body) = send_form(&ctx, "/oauth/revoke", "client_id=app&org_id=org1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "token is required");

        let (status, body) =
            send_form(&ctx, "/oauth/revoke_all", "client_id=app&client_secret=s3cret&org_id=org1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "tokens revoked successfully");

        let (status, body) = send_form(&ctx, "/oauth/revoke_all", "client_secret=x").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "client_id is required");
    }

    #[tokio::test]
    async fn test_policy_definitions_written_to_disk() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/policies",
            Some(json!({"id": "gold", "org_id": "org1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "added");
        assert!(ctx.policy_path().join("gold.json").exists());

        let (status, body) = send(
            &ctx,
            Method::PUT,
            "/policies/silver",
            Some(json!({"id": "gold", "org_id": "org1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Request ID does not match that in policy! For Update operations these must match."
        );

        // Not visible until the next reload
        let (status, _) = send(&ctx, Method::GET, "/policies/gold", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&ctx, Method::GET, "/reload?block=true", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, policy) = send(&ctx, Method::GET, "/policies/gold", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(policy["org_id"], "org1");

        let (status, body) = send(&ctx, Method::DELETE, "/policies/gold", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "deleted");

        let (status, body) = send(&ctx, Method::DELETE, "/policies/gold", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Delete failed");
    }

    #[tokio::test]
    async fn test_api_definitions_with_oas_companion() {
        let ctx = context(vec![api1()], vec![]).await;

        let definition = json!({
            "api_id": "api2",
            "name": "Second",
            "org_id": "org1",
            "proxy": {"listen_path": "/api2/", "target_url": "http://upstream"}
        });

        let (status, body) = send(&ctx, Method::POST, "/apis", Some(definition.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "added");
        assert!(ctx.app_path().join("api2.json").exists());
        assert!(ctx.app_path().join("api2-oas.json").exists());

        let (status, body) = send(&ctx, Method::PUT, "/apis/api3", Some(definition)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Request APIID does not match that in Definition! For Update operations these must match."
        );

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/apis",
            Some(json!({"api_id": "api4", "name": "Bad", "proxy": {"listen_path": "api4"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Validation of API Definition failed."));

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/apis?type=oas",
            Some(json!({"openapi": "3.0.3", "paths": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Couldn't find x-gateway extension in the document");

        send(&ctx, Method::POST, "/reload?block=true", None).await;

        let (status, oas) = send(&ctx, Method::GET, "/apis/api2?type=oas", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(oas["x-gateway"]["api_id"], "api2");

        let (_, apis) = send(&ctx, Method::GET, "/apis", None).await;
        assert_eq!(apis.as_array().unwrap().len(), 2);

        let (status, body) = send(&ctx, Method::DELETE, "/apis/api2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "deleted");
        assert!(!ctx.app_path().join("api2-oas.json").exists());
    }

    #[tokio::test]
    async fn test_group_reload_reaches_local_registry() {
        let ctx = context(vec![api1()], vec![]).await;
        NotificationListener::new(ctx.bus.clone(), ctx.state.reload.clone())
            .start()
            .await
            .unwrap();

        ctx.state
            .definitions
            .write_api(&ApiDefinition::new("api2", "org1", "/api2/"))
            .await
            .unwrap();
        assert!(ctx.state.registry.api("api2").is_none());

        let (status, body) = send(&ctx, Method::POST, "/reload/group", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let mut loaded = false;
        for _ in 0..100 {
            if ctx.state.registry.api("api2").is_some() {
                loaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(loaded);
    }

    #[tokio::test]
    async fn test_org_sessions() {
        let ctx = context(vec![api1()], vec![]).await;

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/orgs/org1?reset_quota=1",
            Some(json!({"org_id": "org1", "quota_max": 1000, "quota_renewal_rate": 60})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "added");

        let (status, session) = send(&ctx, Method::GET, "/orgs/org1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["quota_max"], 1000);

        let (_, list) = send(&ctx, Method::GET, "/orgs", None).await;
        assert_eq!(list["keys"], json!(["org1"]));

        let (status, body) = send(&ctx, Method::DELETE, "/orgs/org1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "deleted");

        let (status, body) = send(&ctx, Method::GET, "/orgs/org1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Org not found");
    }
}
