//! Key set cache for bearer token verification.
//!
//! Fetches the remote JSON Web Key Set and keeps an immutable snapshot of
//! the usable signing keys until it expires.
//!
//! # Concurrency
//!
//! - Readers clone an `Arc` to the current snapshot under a short read lock,
//!   so a refresh never exposes a partially built key set
//! - Refreshes are single-flight: callers that find the snapshot expired
//!   queue on a refresh lock and re-check before fetching
//! - No lock on the snapshot itself is held across the network fetch. The
//!   refresh lock is: queued callers wait for at most one fetch, which the
//!   fetcher bounds with its timeout, and then read the fresh snapshot

use crate::errors::GatewayError;
use crate::observability::metrics::record_jwks_refresh;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::instrument;

/// Default snapshot validity in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (only "sig" keys are loaded).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// Public key x coordinate (EC) or public key bytes (OKP), base64url.
    #[serde(default)]
    pub x: Option<String>,

    /// Public key y coordinate (EC), base64url.
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Source of the remote key set.
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// Fetch the current key set document.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::UpstreamFetch` when the document cannot be
    /// retrieved or parsed.
    async fn fetch(&self) -> Result<JwksResponse, GatewayError>;
}

/// Fetches the key set over HTTP with a bounded timeout.
pub struct HttpJwksFetcher {
    jwks_url: String,
    http_client: reqwest::Client,
}

impl HttpJwksFetcher {
    /// Create a fetcher for `jwks_url`; every request is bounded by `timeout`.
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gateway.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    async fn fetch(&self) -> Result<JwksResponse, GatewayError> {
        tracing::debug!(target: "gateway.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gateway.auth.jwks", error = %e, "Failed to fetch JWKS");
                GatewayError::UpstreamFetch(format!("JWKS request failed: {e}"))
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gateway.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(GatewayError::UpstreamFetch(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "gateway.auth.jwks", error = %e, "Failed to parse JWKS response");
            GatewayError::UpstreamFetch(format!("JWKS response unparseable: {e}"))
        })
    }
}

/// A verification key loaded from the key set.
#[derive(Clone)]
pub struct SigningKey {
    /// Key ID the token header must reference.
    pub key_id: String,

    algorithms: Vec<Algorithm>,

    key_material: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithms", &self.algorithms)
            .field("key_material", &"[DecodingKey]")
            .finish()
    }
}

impl SigningKey {
    /// Convert a JWK into a signing key.
    ///
    /// A JWK with `alg` verifies only that algorithm. Without `alg`, an RSA
    /// key verifies any RS*/PS* algorithm and an EC key only its curve's.
    ///
    /// Returns `None` for keys that are not usable for signature
    /// verification: non-"sig" use, missing kid, unknown key type or curve,
    /// an `alg` inconsistent with the key type, or malformed components.
    pub fn from_jwk(jwk: &Jwk) -> Option<Self> {
        if jwk.kid.is_empty() {
            return None;
        }
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            return None;
        }

        let declared = match jwk.alg.as_deref() {
            Some(alg) => Some(Algorithm::from_str(alg).ok()?),
            None => None,
        };

        let (algorithms, key_material) = match jwk.kty.as_str() {
            "RSA" => {
                let algorithms = match declared {
                    Some(alg) if RSA_ALGORITHMS.contains(&alg) => vec![alg],
                    Some(_) => return None,
                    None => RSA_ALGORITHMS.to_vec(),
                };
                let key = DecodingKey::from_rsa_components(jwk.n.as_deref()?, jwk.e.as_deref()?)
                    .ok()?;
                (algorithms, key)
            }
            "EC" => {
                let algorithm = match jwk.crv.as_deref()? {
                    "P-256" => Algorithm::ES256,
                    "P-384" => Algorithm::ES384,
                    _ => return None,
                };
                if declared.is_some_and(|d| d != algorithm) {
                    return None;
                }
                let key = DecodingKey::from_ec_components(jwk.x.as_deref()?, jwk.y.as_deref()?)
                    .ok()?;
                (vec![algorithm], key)
            }
            "OKP" => {
                if jwk.crv.as_deref()? != "Ed25519" {
                    return None;
                }
                if declared.is_some_and(|d| d != Algorithm::EdDSA) {
                    return None;
                }
                let key = DecodingKey::from_ed_components(jwk.x.as_deref()?).ok()?;
                (vec![Algorithm::EdDSA], key)
            }
            _ => return None,
        };

        Some(Self {
            key_id: jwk.kid.clone(),
            algorithms,
            key_material,
        })
    }

    /// Whether this key may verify tokens signed with `algorithm`.
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Key material for signature verification.
    pub fn key_material(&self) -> &DecodingKey {
        &self.key_material
    }
}

const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Immutable view of the key set as of one fetch.
#[derive(Debug)]
pub struct KeySetSnapshot {
    keys: HashMap<String, SigningKey>,

    /// When the key set was fetched.
    pub fetched_at: Instant,

    /// The snapshot is usable strictly before this instant.
    pub valid_until: Instant,
}

impl KeySetSnapshot {
    /// Look up a key by ID.
    pub fn find(&self, key_id: &str) -> Option<&SigningKey> {
        self.keys.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.valid_until
    }
}

/// Owner of the current key set snapshot.
///
/// Construct one per process and share it through an `Arc`.
pub struct KeySetCache {
    fetcher: Arc<dyn JwksFetcher>,
    snapshot: RwLock<Option<Arc<KeySetSnapshot>>>,
    refresh_lock: Mutex<()>,
    ttl: Duration,
}

impl KeySetCache {
    /// Create a cache with the default 1 hour validity.
    pub fn new(fetcher: Arc<dyn JwksFetcher>) -> Self {
        Self::with_ttl(fetcher, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a cache with a custom validity window (at least 1 second).
    pub fn with_ttl(fetcher: Arc<dyn JwksFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            ttl: ttl.max(Duration::from_secs(1)),
        }
    }

    /// Return the current key set, fetching it if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::UpstreamFetch` if a refresh was needed and
    /// failed. The expired snapshot is kept but never served.
    #[instrument(skip_all, name = "gateway.auth.jwks.get_keys")]
    pub async fn get_keys(&self) -> Result<Arc<KeySetSnapshot>, GatewayError> {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }

        let _refresh_guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(snapshot) = self.current().await {
            tracing::debug!(target: "gateway.auth.jwks", "JWKS refresh coalesced");
            return Ok(snapshot);
        }

        self.refresh().await
    }

    async fn current(&self) -> Option<Arc<KeySetSnapshot>> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .filter(|snapshot| snapshot.is_valid_at(Instant::now()))
            .cloned()
    }

    async fn refresh(&self) -> Result<Arc<KeySetSnapshot>, GatewayError> {
        let document = match self.fetcher.fetch().await {
            Ok(document) => document,
            Err(e) => {
                record_jwks_refresh("error");
                return Err(e);
            }
        };

        let total = document.keys.len();
        let keys: HashMap<String, SigningKey> = document
            .keys
            .iter()
            .filter_map(|jwk| {
                let key = SigningKey::from_jwk(jwk);
                if key.is_none() {
                    tracing::debug!(
                        target: "gateway.auth.jwks",
                        kid = %jwk.kid,
                        kty = %jwk.kty,
                        "Skipping unusable JWK"
                    );
                }
                key
            })
            .map(|key| (key.key_id.clone(), key))
            .collect();

        let fetched_at = Instant::now();
        let snapshot = Arc::new(KeySetSnapshot {
            keys,
            fetched_at,
            valid_until: fetched_at + self.ttl,
        });

        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        record_jwks_refresh("success");

        tracing::info!(
            target: "gateway.auth.jwks",
            loaded = snapshot.len(),
            skipped = total - snapshot.len(),
            "JWKS refreshed"
        );

        Ok(snapshot)
    }
}

/// Mock key set source for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock fetcher that serves a fixed document and counts calls.
    pub struct MockJwksFetcher {
        document: JwksResponse,
        call_count: AtomicUsize,
        failing: AtomicBool,
        delay: Duration,
    }

    impl MockJwksFetcher {
        /// Serve `document` on every fetch.
        pub fn serving(document: JwksResponse) -> Self {
            Self {
                document,
                call_count: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        /// Fail every fetch.
        pub fn failing() -> Self {
            let mock = Self::serving(JwksResponse::default());
            mock.set_failing(true);
            mock
        }

        /// Sleep for `delay` before answering.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Switch failure mode on or off.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Get the number of fetches made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JwksFetcher for MockJwksFetcher {
        async fn fetch(&self) -> Result<JwksResponse, GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if self.failing.load(Ordering::SeqCst) {
                return Err(GatewayError::UpstreamFetch(
                    "Mock JWKS fetch error".to_string(),
                ));
            }

            Ok(self.document.clone())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockJwksFetcher;
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Public half of RFC 8037 Appendix A.
    const ED25519_X: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";

    fn okp_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: kid.to_string(),
            alg: Some("EdDSA".to_string()),
            key_use: Some("sig".to_string()),
            crv: Some("Ed25519".to_string()),
            x: Some(ED25519_X.to_string()),
            ..Jwk::default()
        }
    }

    fn document(keys: Vec<Jwk>) -> JwksResponse {
        JwksResponse { keys }
    }

    #[test]
    fn test_from_jwk_okp() {
        let key = SigningKey::from_jwk(&okp_jwk("k1")).unwrap();
        assert_eq!(key.key_id, "k1");
        assert_eq!(key.algorithms(), &[Algorithm::EdDSA]);
    }

    fn rsa_jwk(alg: Option<&str>) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: "rsa-1".to_string(),
            alg: alg.map(str::to_string),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
            ..Jwk::default()
        }
    }

    #[test]
    fn test_from_jwk_rsa_without_alg_supports_every_rsa_algorithm() {
        let key = SigningKey::from_jwk(&rsa_jwk(None)).unwrap();

        for alg in [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512, Algorithm::PS256] {
            assert!(key.supports(alg), "{alg:?}");
        }
        assert!(!key.supports(Algorithm::ES256));
        assert!(!key.supports(Algorithm::EdDSA));
        assert!(!key.supports(Algorithm::HS256));
    }

    #[test]
    fn test_from_jwk_rsa_with_alg_is_pinned() {
        let key = SigningKey::from_jwk(&rsa_jwk(Some("RS384"))).unwrap();

        assert_eq!(key.algorithms(), &[Algorithm::RS384]);
        assert!(!key.supports(Algorithm::RS256));
    }

    #[test]
    fn test_from_jwk_ec_without_alg_matches_curve_only() {
        // P-256 generator point
        let jwk = Jwk {
            kty: "EC".to_string(),
            kid: "ec-1".to_string(),
            crv: Some("P-256".to_string()),
            x: Some("axfR8uEsQkf4vOblY6RA8ncDfYEt6zOg9KE5RdiYwpY".to_string()),
            y: Some("T-NC4v4af5uO5-tKfA-eFivOM1drMV7Oy7ZAaDe_UfU".to_string()),
            ..Jwk::default()
        };

        let key = SigningKey::from_jwk(&jwk).unwrap();
        assert_eq!(key.algorithms(), &[Algorithm::ES256]);
        assert!(!key.supports(Algorithm::ES384));
    }

    #[test]
    fn test_from_jwk_skips_unusable_keys() {
        let mut encryption_key = okp_jwk("enc");
        encryption_key.key_use = Some("enc".to_string());
        assert!(SigningKey::from_jwk(&encryption_key).is_none());

        assert!(SigningKey::from_jwk(&okp_jwk("")).is_none());

        let mut wrong_alg = okp_jwk("wrong-alg");
        wrong_alg.alg = Some("RS256".to_string());
        assert!(SigningKey::from_jwk(&wrong_alg).is_none());

        let mut unknown_alg = okp_jwk("unknown-alg");
        unknown_alg.alg = Some("none".to_string());
        assert!(SigningKey::from_jwk(&unknown_alg).is_none());

        let mut missing_x = okp_jwk("missing-x");
        missing_x.x = None;
        assert!(SigningKey::from_jwk(&missing_x).is_none());

        let symmetric = Jwk {
            kty: "oct".to_string(),
            kid: "hmac".to_string(),
            ..Jwk::default()
        };
        assert!(SigningKey::from_jwk(&symmetric).is_none());

        let rsa_with_hmac_alg = Jwk {
            kty: "RSA".to_string(),
            kid: "rsa-hs".to_string(),
            alg: Some("HS256".to_string()),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
            ..Jwk::default()
        };
        assert!(SigningKey::from_jwk(&rsa_with_hmac_alg).is_none());
    }

    #[test]
    fn test_signing_key_debug_hides_material() {
        let key = SigningKey::from_jwk(&okp_jwk("k1")).unwrap();
        let debug_str = format!("{:?}", key);
        assert!(debug_str.contains("k1"));
        assert!(!debug_str.contains(ED25519_X));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_keys_fetches_once_within_validity_window() {
        let fetcher = Arc::new(MockJwksFetcher::serving(document(vec![okp_jwk("k1")])));
        let cache = KeySetCache::new(fetcher.clone());

        for _ in 0..10 {
            let snapshot = cache.get_keys().await.unwrap();
            assert!(snapshot.find("k1").is_some());
        }

        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_keys_refetches_after_expiry() {
        let fetcher = Arc::new(MockJwksFetcher::serving(document(vec![okp_jwk("k1")])));
        let cache = KeySetCache::with_ttl(fetcher.clone(), Duration::from_secs(60));

        let first = cache.get_keys().await.unwrap();
        assert!(first.valid_until > first.fetched_at);

        tokio::time::advance(Duration::from_secs(59)).await;
        cache.get_keys().await.unwrap();
        assert_eq!(fetcher.call_count(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let second = cache.get_keys().await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
        assert!(second.fetched_at > first.fetched_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_is_one_hour() {
        let fetcher = Arc::new(MockJwksFetcher::serving(document(vec![okp_jwk("k1")])));
        let cache = KeySetCache::new(fetcher.clone());

        let snapshot = cache.get_keys().await.unwrap();
        assert_eq!(
            snapshot.valid_until - snapshot.fetched_at,
            Duration::from_secs(3600)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_is_upstream_error() {
        let fetcher = Arc::new(MockJwksFetcher::failing());
        let cache = KeySetCache::new(fetcher.clone());

        let result = cache.get_keys().await;
        assert!(matches!(result, Err(GatewayError::UpstreamFetch(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_snapshot_is_not_served_when_refresh_fails() {
        let fetcher = Arc::new(MockJwksFetcher::serving(document(vec![okp_jwk("k1")])));
        let cache = KeySetCache::with_ttl(fetcher.clone(), Duration::from_secs(10));

        cache.get_keys().await.unwrap();
        fetcher.set_failing(true);
        tokio::time::advance(Duration::from_secs(11)).await;

        let result = cache.get_keys().await;
        assert!(matches!(result, Err(GatewayError::UpstreamFetch(_))));

        // Recovers on the next successful fetch
        fetcher.set_failing(false);
        let snapshot = cache.get_keys().await.unwrap();
        assert!(snapshot.find("k1").is_some());
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let fetcher = Arc::new(
            MockJwksFetcher::serving(document(vec![okp_jwk("k1")]))
                .with_delay(Duration::from_millis(100)),
        );
        let cache = Arc::new(KeySetCache::new(fetcher.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_keys().await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_skips_unusable_keys() {
        let mut enc = okp_jwk("enc");
        enc.key_use = Some("enc".to_string());
        let fetcher = Arc::new(MockJwksFetcher::serving(document(vec![
            okp_jwk("k1"),
            enc,
        ])));
        let cache = KeySetCache::new(fetcher);

        let snapshot = cache.get_keys().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.find("enc").is_none());
    }

    #[tokio::test]
    async fn test_http_fetcher_parses_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{
                    "kty": "OKP",
                    "kid": "k1",
                    "crv": "Ed25519",
                    "x": ED25519_X,
                    "alg": "EdDSA",
                    "use": "sig"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Arc::new(HttpJwksFetcher::new(
            format!("{}/.well-known/jwks.json", server.uri()),
            Duration::from_secs(5),
        ));
        let cache = KeySetCache::new(fetcher);

        let snapshot = cache.get_keys().await.unwrap();
        assert!(snapshot.find("k1").is_some());
        cache.get_keys().await.unwrap();
    }

    #[tokio::test]
    async fn test_http_fetcher_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpJwksFetcher::new(server.uri(), Duration::from_secs(5));
        let result = fetcher.fetch().await;
        assert!(matches!(result, Err(GatewayError::UpstreamFetch(_))));
    }

    #[tokio::test]
    async fn test_http_fetcher_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "keys": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpJwksFetcher::new(server.uri(), Duration::from_millis(200));
        let result = fetcher.fetch().await;
        assert!(matches!(result, Err(GatewayError::UpstreamFetch(_))));
    }
}
