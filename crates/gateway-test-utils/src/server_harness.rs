//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.
//! Collaborators that need infrastructure (Postgres, the flag table) are
//! replaced with mocks; the JWKS endpoint is real HTTP.

use gateway_service::auth::{HttpJwksFetcher, KeySetCache, TokenVerifier};
use gateway_service::config::Config;
use gateway_service::routes::{self, AppState};
use gateway_service::services::{
    FeatureGate, FlagStore, MockFlagStore, MockQueryExecutor, QueryExecutor,
};
use jsonwebtoken::Algorithm;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Webhook secret used unless a test overrides it.
pub const TEST_WEBHOOK_SECRET: &str = "s";

/// Origin allowed by the default CORS policy.
pub const TEST_ORIGIN: &str = "https://app.example.com";

/// Options for `TestGatewayServer::spawn`.
pub struct TestGatewayOptions {
    jwks_url: String,
    flag_store: Arc<dyn FlagStore>,
    executor: Arc<dyn QueryExecutor>,
    webhook_secret: String,
    cors_origins: String,
    algorithm: Algorithm,
}

impl TestGatewayOptions {
    pub fn jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    pub fn flag_store(mut self, store: Arc<dyn FlagStore>) -> Self {
        self.flag_store = store;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = secret.to_string();
        self
    }

    /// Comma-separated origin list, or `*`.
    pub fn cors_origins(mut self, origins: &str) -> Self {
        self.cors_origins = origins.to_string();
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub async fn spawn(self) -> Result<TestGatewayServer, anyhow::Error> {
        TestGatewayServer::spawn_with(self).await
    }
}

impl Default for TestGatewayOptions {
    fn default() -> Self {
        Self {
            // Nothing listens here; tests that verify tokens set a real URL
            jwks_url: "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            flag_store: Arc::new(MockFlagStore::enabled()),
            executor: Arc::new(MockQueryExecutor::empty()),
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            cors_origins: TEST_ORIGIN.to_string(),
            algorithm: Algorithm::EdDSA,
        }
    }
}

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestGatewayServer::builder().spawn().await?;
///     let response = reqwest::get(format!("{}/v1/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    pub fn builder() -> TestGatewayOptions {
        TestGatewayOptions::default()
    }

    /// Spawn a new test server instance.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    async fn spawn_with(options: TestGatewayOptions) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_URL".to_string(), options.jwks_url.clone()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
            ("WEBHOOK_HMAC_SECRET".to_string(), options.webhook_secret),
            ("CORS_ALLOWED_ORIGINS".to_string(), options.cors_origins),
            ("JWT_ALGORITHM".to_string(), format!("{:?}", options.algorithm)),
            ("ENVIRONMENT".to_string(), "test".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let fetcher = Arc::new(HttpJwksFetcher::new(
            options.jwks_url,
            Duration::from_secs(2),
        ));
        let key_set = Arc::new(KeySetCache::new(fetcher));
        let state = Arc::new(AppState {
            config: config.clone(),
            executor: options.executor,
            token_verifier: Arc::new(TokenVerifier::new(
                key_set,
                config.jwt_algorithm,
                config.jwt_clock_skew_seconds,
            )),
            feature_gate: Arc::new(FeatureGate::new(options.flag_store)),
        });

        // Unregistered recorder: the handle renders an empty exposition
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestGatewayServer::builder().spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.addr().ip().is_loopback());
        assert_eq!(server.config().environment, "test");

        let response = reqwest::get(format!("{}/v1/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "ok");

        Ok(())
    }
}
