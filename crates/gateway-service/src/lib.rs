//! API Gateway Service Library
//!
//! Admission pipeline in front of the `/v1` API. Every request on the
//! protected family passes, in order:
//!
//! 1. Bearer token verification against a cached remote JWKS
//! 2. A fail-open feature flag gate
//! 3. Role checks in the handlers (admin lists only)
//!
//! Partner webhooks skip 1 and 2 and are authenticated by an HMAC-SHA256
//! signature over the raw body instead.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/*.rs -> handlers/*.rs -> repositories/*.rs
//!                                                   -> services/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - JWKS cache, token verification, roles, webhook signatures
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Admission pipeline, CORS, HTTP metrics
//! - `models` - Request and response models
//! - `observability` - Prometheus metrics
//! - `repositories` - Admin list queries
//! - `routes` - Axum router setup
//! - `services` - Query execution and feature flags

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
