//! Token claims and the per-request authenticated identity.
//!
//! `sub` and `email` are redacted in Debug output to keep them out of logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims read from a verified bearer token.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user identifier).
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Primary role claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Fallback role claim used by older issuers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("role", &self.role)
            .field("user_role", &self.user_role)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Identity attached to a request after its bearer token is verified.
///
/// Lives in the request extensions for the duration of one request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub subject: String,

    /// Lowercased role; empty when the token carries none.
    pub role: String,

    /// Empty when the token carries none.
    pub email: String,
}

impl fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("subject", &"[REDACTED]")
            .field("role", &self.role)
            .field("email", &"[REDACTED]")
            .finish()
    }
}

impl From<TokenClaims> for AuthenticatedIdentity {
    fn from(claims: TokenClaims) -> Self {
        let role = claims
            .role
            .or(claims.user_role)
            .unwrap_or_default()
            .to_lowercase();

        Self {
            subject: claims.sub,
            role,
            email: claims.email.unwrap_or_default(),
        }
    }
}
