//! Bearer token verification.
//!
//! Validates incoming JWTs against keys from the [`KeySetCache`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Exactly one asymmetric algorithm is trusted; the token header must name
//!   it and the selected key must support it (algorithm confusion is a hard
//!   failure)
//! - `exp` is required; `iat`, when present, is checked with clock skew
//! - Audience is not validated: tokens issued for sibling services in the
//!   same trust domain are accepted
//! - Generic error messages prevent information leakage

use crate::auth::claims::{AuthenticatedIdentity, TokenClaims};
use crate::auth::jwks::KeySetCache;
use crate::errors::GatewayError;
use crate::observability::metrics::record_token_validation;
use common::jwt::{inspect_header, validate_iat};
use jsonwebtoken::{decode, Algorithm, Validation};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

fn invalid_token() -> GatewayError {
    GatewayError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Verifies bearer tokens and derives the caller's identity.
pub struct TokenVerifier {
    key_set: Arc<KeySetCache>,
    algorithm: Algorithm,
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier trusting only `algorithm`.
    ///
    /// # Arguments
    ///
    /// * `key_set` - Cache of verification keys
    /// * `algorithm` - The single signing algorithm tokens must use
    /// * `clock_skew_seconds` - Tolerance for `iat` in the future
    pub fn new(key_set: Arc<KeySetCache>, algorithm: Algorithm, clock_skew_seconds: i64) -> Self {
        Self {
            key_set,
            algorithm,
            clock_skew: Duration::from_secs(clock_skew_seconds.max(0).unsigned_abs()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Verify a bearer token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// - `GatewayError::InvalidToken` for every token defect, with a
    ///   generic message
    /// - `GatewayError::UpstreamFetch` if the key set is unavailable
    #[instrument(skip_all, name = "gateway.auth.verify")]
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, GatewayError> {
        let result = self.verify_inner(token).await;
        match &result {
            Ok(_) => record_token_validation("success"),
            Err(GatewayError::UpstreamFetch(_)) => record_token_validation("unavailable"),
            Err(_) => record_token_validation("rejected"),
        }
        result
    }

    async fn verify_inner(&self, token: &str) -> Result<AuthenticatedIdentity, GatewayError> {
        // 1. Header inspection (includes size check)
        let header = inspect_header(token).map_err(|e| {
            tracing::debug!(target: "gateway.auth.jwt", error = ?e, "Token header rejected");
            invalid_token()
        })?;

        // 2. The header must name the trusted algorithm, nothing else
        let header_alg = Algorithm::from_str(&header.alg).map_err(|_| {
            tracing::debug!(target: "gateway.auth.jwt", alg = %header.alg, "Unknown token algorithm");
            invalid_token()
        })?;
        if header_alg != self.algorithm {
            tracing::warn!(
                target: "gateway.auth.jwt",
                alg = ?header_alg,
                trusted = ?self.algorithm,
                "Token algorithm does not match trusted algorithm"
            );
            return Err(invalid_token());
        }

        // 3. Key lookup
        let snapshot = self.key_set.get_keys().await?;
        let key = snapshot.find(&header.kid).ok_or_else(|| {
            tracing::debug!(target: "gateway.auth.jwt", kid = %header.kid, "Key not found in JWKS");
            invalid_token()
        })?;
        if !key.supports(self.algorithm) {
            tracing::warn!(
                target: "gateway.auth.jwt",
                kid = %key.key_id,
                key_algs = ?key.algorithms(),
                "JWK algorithm does not match trusted algorithm"
            );
            return Err(invalid_token());
        }

        // 4. Signature and exp
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;

        let token_data =
            decode::<TokenClaims>(token, key.key_material(), &validation).map_err(|e| {
                tracing::debug!(target: "gateway.auth.jwt", error = %e, "Token verification failed");
                invalid_token()
            })?;

        // 5. iat with clock skew tolerance
        if let Some(iat) = token_data.claims.iat {
            if let Err(e) = validate_iat(iat, self.clock_skew) {
                tracing::debug!(target: "gateway.auth.jwt", error = ?e, "Token iat validation failed");
                return Err(invalid_token());
            }
        }

        tracing::debug!(target: "gateway.auth.jwt", "Token validated successfully");
        Ok(AuthenticatedIdentity::from(token_data.claims))
    }
}
