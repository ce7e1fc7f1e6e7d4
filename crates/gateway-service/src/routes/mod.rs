//! HTTP routes for the gateway.
//!
//! Defines the Axum router, the admission pipeline and application state.

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    allowed_origins, build_cors_layer, http_metrics_middleware, run_admission, AdmissionPipeline,
    FeatureGateStage, StageScope, TokenAuthStage,
};
use crate::services::{FeatureGate, QueryExecutor};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Prefix of the protected route family.
pub const API_PREFIX: &str = "/v1/";

/// Health check path, exempt from every admission stage.
pub const HEALTH_PATH: &str = "/v1/health";

/// Webhook paths authenticate by signature, not by token or flag.
pub const WEBHOOK_PREFIX: &str = "/v1/webhooks/";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Relational query collaborator for the admin lists.
    pub executor: Arc<dyn QueryExecutor>,

    /// Bearer token verifier (owns the key set cache).
    pub token_verifier: Arc<TokenVerifier>,

    /// Feature gate for the `/v1` family.
    pub feature_gate: Arc<FeatureGate>,
}

/// Paths the token and feature gate stages apply to.
pub fn admission_scope() -> StageScope {
    StageScope::under(API_PREFIX)
        .except(HEALTH_PATH)
        .except_prefix(WEBHOOK_PREFIX)
}

/// Admission stages in their fixed order: token verification, then the
/// feature gate. Role checks happen later, in the handlers.
pub fn build_pipeline(state: &AppState) -> AdmissionPipeline {
    AdmissionPipeline::new()
        .stage(
            Arc::new(TokenAuthStage::new(Arc::clone(&state.token_verifier))),
            admission_scope(),
        )
        .stage(
            Arc::new(FeatureGateStage::new(
                Arc::clone(&state.feature_gate),
                state.config.feature_flag_name.clone(),
            )),
            admission_scope(),
        )
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - Health check (public)
/// - `/v1/webhooks/:partner` - Partner webhooks (HMAC signature)
/// - `/v1/admin/users`, `/v1/admin/companies`, `/v1/admin/leads` - Admin
///   lists (bearer token, feature flag, admin role)
/// - `/metrics` - Prometheus metrics endpoint (public, unversioned)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let pipeline = Arc::new(build_pipeline(&state));
    let cors = build_cors_layer(&allowed_origins(&state.config.cors_allowed_origins));

    let api_routes = Router::new()
        .route(HEALTH_PATH, get(handlers::health_check))
        .route("/v1/webhooks/:partner", post(handlers::receive_webhook))
        .route("/v1/admin/users", get(handlers::list_users))
        .route("/v1/admin/companies", get(handlers::list_companies))
        .route("/v1/admin/leads", get(handlers::list_leads))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. run_admission - Token then feature gate, also for unrouted /v1 paths
    // 2. TimeoutLayer / TraceLayer
    // 3. CORS - Decorates every response, including rejections
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(middleware::from_fn_with_state(pipeline, run_admission))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}
