//! Routes the HTTP surface through `tower::ServiceExt::oneshot` instead of a
//! bound socket, the same way the teacher's handler tests exercise a router
//! directly.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bento_authz::auth::TokenVerifier;
use bento_authz::config::{Config, Superuser};
use bento_authz::http::{router, AppState};
use bento_authz::policy::PolicyEngine;
use bento_authz::store::memory::MemoryStore;
use bento_authz::store::Store;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config(superusers: Vec<Superuser>) -> Config {
    Config {
        database_uri: String::new(),
        openid_config_url: "http://localhost/unused".to_string(),
        token_audience: vec!["bento".to_string()],
        disable_token_verification: true,
        debug: true,
        service_url: Some("http://localhost:8080".to_string()),
        cors_origins: Vec::new(),
        superusers,
        bind_address: "127.0.0.1:0".to_string(),
        db_max_connections: 1,
        jwks_cache_ttl: Duration::from_secs(600),
        jwt_leeway_secs: 30,
        request_timeout: Duration::from_secs(10),
    }
}

fn test_app(config: Config) -> axum::Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let verifier = TokenVerifier::new(
        config.openid_config_url.clone(),
        config.token_audience.clone(),
        config.jwt_leeway_secs,
        config.jwks_cache_ttl.as_secs(),
        config.disable_token_verification,
    );
    let policy = PolicyEngine::new(store.clone(), config.superusers.clone());
    router(Arc::new(AppState { store, verifier, policy, config }))
}

/// An unverified-mode bearer token: `DISABLE_TOKEN_VERIFICATION` trusts the
/// base64-decoded payload outright, so no real signature is needed.
fn unverified_bearer(iss: &str, sub: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "none"}).to_string());
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"iss": iss, "sub": sub, "aud": "bento", "exp": 9999999999_i64}).to_string(),
    );
    format!("{header}.{payload}.")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_store_health() {
    let app = test_app(test_config(Vec::new()));
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_evaluate_denies_against_an_empty_store() {
    let app = test_app(test_config(Vec::new()));
    let body = json!({
        "resources": [{"type": "Project", "project_id": "p1"}],
        "permissions": ["query:data"],
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/policy/evaluate")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["result"], json!([[false]]));
}

#[tokio::test]
async fn grant_creation_requires_edit_permissions() {
    let app = test_app(test_config(Vec::new()));
    let body = json!({
        "subject_pattern": {"type": "Everyone"},
        "resource_pattern": {"type": "Everything"},
        "permission": "edit:groups",
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/grants")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn superuser_can_create_a_grant() {
    let superuser = Superuser { iss: "https://issuer.example".into(), sub: "admin".into() };
    let app = test_app(test_config(vec![superuser]));
    let bearer = unverified_bearer("https://issuer.example", "admin");

    let body = json!({
        "subject_pattern": {"type": "Everyone"},
        "resource_pattern": {"type": "Everything"},
        "permission": "edit:groups",
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/grants")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {bearer}"))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}
