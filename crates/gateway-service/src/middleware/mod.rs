//! Middleware for the gateway.
//!
//! # Components
//!
//! - `cors` - Origin policy and the CORS layer
//! - `pipeline` - Ordered admission stages with path-scoped exemptions
//! - `auth` - Bearer token admission stage
//! - `feature_gate` - Feature flag admission stage
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod cors;
pub mod feature_gate;
pub mod http_metrics;
pub mod pipeline;

pub use auth::{extract_bearer_token, TokenAuthStage};
pub use cors::{allowed_origins, build_cors_layer};
pub use feature_gate::FeatureGateStage;
pub use http_metrics::http_metrics_middleware;
pub use pipeline::{run_admission, AdmissionPipeline, AdmissionStage, StageScope};
