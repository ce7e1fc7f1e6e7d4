//! Authentication and authorization.
//!
//! # Components
//!
//! - `jwks` - Key set cache fed by the remote JWKS endpoint
//! - `jwt` - Bearer token verification against cached keys
//! - `claims` - Token claims and the per-request identity
//! - `rbac` - Admin role check
//! - `webhook` - HMAC-SHA256 webhook signature verification

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod rbac;
pub mod webhook;

pub use claims::AuthenticatedIdentity;
pub use jwks::{HttpJwksFetcher, JwksFetcher, KeySetCache};
pub use jwt::TokenVerifier;
pub use rbac::require_admin;
