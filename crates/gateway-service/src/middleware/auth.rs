//! Bearer token admission stage.
//!
//! Extracts the Bearer token from the Authorization header, verifies it and
//! stores the `AuthenticatedIdentity` in request extensions for handlers.

use crate::auth::TokenVerifier;
use crate::errors::GatewayError;
use crate::middleware::pipeline::AdmissionStage;
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, HeaderMap};
use std::sync::Arc;

/// Extract the token from `Authorization: Bearer <token>`.
///
/// # Errors
///
/// Returns `GatewayError::InvalidToken` if the header is missing, not
/// ASCII, or not a Bearer credential.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, GatewayError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gateway.middleware.auth", "Missing Authorization header");
            GatewayError::InvalidToken("Missing Authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "gateway.middleware.auth", "Invalid Authorization header format");
            GatewayError::InvalidToken("Invalid Authorization header format".to_string())
        })?;

    Ok(token)
}

/// Admission stage requiring a valid bearer token.
pub struct TokenAuthStage {
    verifier: Arc<TokenVerifier>,
}

impl TokenAuthStage {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl AdmissionStage for TokenAuthStage {
    fn name(&self) -> &'static str {
        "token_auth"
    }

    async fn admit(&self, req: &mut Request) -> Result<(), GatewayError> {
        // Owned copy: no borrow of the request may live across the await
        let token = extract_bearer_token(req.headers())?.to_string();
        let identity = self.verifier.verify(&token).await?;

        req.extensions_mut().insert(identity);
        Ok(())
    }
}
