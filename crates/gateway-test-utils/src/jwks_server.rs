//! Wiremock-backed JWKS endpoint.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the key set is served on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running JWKS endpoint. Dropping it shuts the mock server down.
pub struct TestJwksServer {
    server: MockServer,
}

impl TestJwksServer {
    /// Serve a key set publishing `keys`.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        Self::serving(jwks_document(keys)).await
    }

    /// Serve an arbitrary JWKS document, e.g. `{"keys": [rsa.jwk_json(..)]}`.
    pub async fn serving(document: Value) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&server)
            .await;
        Self { server }
    }

    /// An endpoint that answers every fetch with 503.
    pub async fn unavailable() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Full URL of the key set document.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of fetches the endpoint has served so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
