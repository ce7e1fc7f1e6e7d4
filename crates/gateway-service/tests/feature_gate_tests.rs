//! Feature gate and CORS integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use gateway_service::services::{FlagStore, MockFlagStore};
use gateway_test_utils::{
    TestGatewayServer, TestJwksServer, TestKeypair, TestTokenBuilder, TEST_ORIGIN,
};
use std::sync::Arc;

struct Fixture {
    key: TestKeypair,
    _jwks: TestJwksServer,
    server: TestGatewayServer,
}

async fn fixture(flag_store: Arc<dyn FlagStore>) -> Result<Fixture> {
    let key = TestKeypair::generate("key-1");
    let jwks = TestJwksServer::start(&[&key]).await;
    let server = TestGatewayServer::builder()
        .jwks_url(jwks.url())
        .flag_store(flag_store)
        .spawn()
        .await?;
    Ok(Fixture {
        key,
        _jwks: jwks,
        server,
    })
}

fn admin_token(key: &TestKeypair) -> String {
    key.sign(&TestTokenBuilder::new().with_role("admin").build())
}

async fn get(f: &Fixture, path: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("{}{}", f.server.url(), path))
        .bearer_auth(admin_token(&f.key))
        .header("Origin", TEST_ORIGIN)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_disabled_flag_looks_like_missing_route() -> Result<()> {
    let store = Arc::new(MockFlagStore::disabled());
    let f = fixture(store.clone()).await?;

    let gated = get(&f, "/v1/admin/users").await;
    assert_eq!(gated.status(), 404);
    assert!(gated.bytes().await?.is_empty());
    assert_eq!(store.call_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_disabled_flag_matches_unknown_route_response() -> Result<()> {
    let disabled = fixture(Arc::new(MockFlagStore::disabled())).await?;
    let enabled = fixture(Arc::new(MockFlagStore::enabled())).await?;

    let gated = get(&disabled, "/v1/admin/users").await;
    let missing = get(&enabled, "/v1/admin/nothing-here").await;

    assert_eq!(gated.status(), missing.status());
    assert_eq!(gated.bytes().await?, missing.bytes().await?);
    Ok(())
}

#[tokio::test]
async fn test_enabled_flag_passes() -> Result<()> {
    let f = fixture(Arc::new(MockFlagStore::enabled())).await?;

    let response = get(&f, "/v1/admin/users").await;
    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_absent_flag_fails_open() -> Result<()> {
    let f = fixture(Arc::new(MockFlagStore::absent())).await?;

    let response = get(&f, "/v1/admin/users").await;
    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_flag_store_error_fails_open() -> Result<()> {
    let f = fixture(Arc::new(MockFlagStore::failing())).await?;

    let response = get(&f, "/v1/admin/users").await;
    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_flag_not_consulted_for_rejected_token() -> Result<()> {
    let store = Arc::new(MockFlagStore::disabled());
    let f = fixture(store.clone()).await?;

    let response = reqwest::get(format!("{}/v1/admin/users", f.server.url())).await?;

    assert_eq!(response.status(), 401);
    assert_eq!(store.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_health_skips_flag() -> Result<()> {
    let store = Arc::new(MockFlagStore::disabled());
    let f = fixture(store.clone()).await?;

    let response = reqwest::get(format!("{}/v1/health", f.server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(store.call_count(), 0);
    Ok(())
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_cors_headers_on_success_and_rejection() -> Result<()> {
    let f = fixture(Arc::new(MockFlagStore::enabled())).await?;

    let ok = get(&f, "/v1/admin/users").await;
    assert_eq!(ok.headers()["access-control-allow-origin"], TEST_ORIGIN);
    assert_eq!(ok.headers()["access-control-allow-credentials"], "true");

    let rejected = reqwest::Client::new()
        .get(format!("{}/v1/admin/users", f.server.url()))
        .header("Origin", TEST_ORIGIN)
        .send()
        .await?;
    assert_eq!(rejected.status(), 401);
    assert_eq!(rejected.headers()["access-control-allow-origin"], TEST_ORIGIN);

    Ok(())
}

#[tokio::test]
async fn test_cors_preflight_is_answered_without_token() -> Result<()> {
    let f = fixture(Arc::new(MockFlagStore::enabled())).await?;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/v1/admin/users", f.server.url()),
        )
        .header("Origin", TEST_ORIGIN)
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await?;

    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], TEST_ORIGIN);
    Ok(())
}

#[tokio::test]
async fn test_unlisted_origin_gets_no_cors_headers() -> Result<()> {
    let f = fixture(Arc::new(MockFlagStore::enabled())).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/v1/health", f.server.url()))
        .header("Origin", "https://evil.example.net")
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
    Ok(())
}
