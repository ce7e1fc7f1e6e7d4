//! # Gateway Test Utilities
//!
//! Shared test utilities for the API gateway.
//!
//! This crate provides:
//! - Ed25519 signing keys and token forgeries (`crypto_fixtures`)
//! - Claims builder (`TestTokenBuilder`)
//! - A wiremock-backed JWKS endpoint (`TestJwksServer`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key = TestKeypair::generate("key-1");
//!     let jwks = TestJwksServer::start(&[&key]).await;
//!     let server = TestGatewayServer::builder()
//!         .jwks_url(jwks.url())
//!         .spawn()
//!         .await?;
//!
//!     let token = key.sign(&TestTokenBuilder::new().with_role("admin").build());
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/v1/admin/users", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use server_harness::*;
pub use token_builders::*;
