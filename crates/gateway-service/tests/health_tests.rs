//! Health and metrics endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use gateway_test_utils::{TestGatewayServer, TestJwksServer};

#[tokio::test]
async fn test_health_needs_no_credentials() -> Result<()> {
    // JWKS endpoint is down; health must not touch it
    let jwks = TestJwksServer::unavailable().await;
    let server = TestGatewayServer::builder()
        .jwks_url(jwks.url())
        .spawn()
        .await?;

    let response = reqwest::get(format!("{}/v1/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert!(body["version"].is_string());
    assert_eq!(jwks.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_metrics_is_outside_versioned_family() -> Result<()> {
    let server = TestGatewayServer::builder().spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_unknown_unversioned_route_is_404() -> Result<()> {
    let server = TestGatewayServer::builder().spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 404);
    assert!(response.bytes().await?.is_empty());

    Ok(())
}
