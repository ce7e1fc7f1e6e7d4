//! Prometheus metrics endpoint handler.
//!
//! `/metrics` sits outside `/v1` and is unauthenticated so Prometheus can
//! scrape it. Labels carry no identities or secrets.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus text format:
/// ```text
/// # TYPE gateway_http_requests_total counter
/// gateway_http_requests_total{method="GET",endpoint="/v1/health",status_code="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "gateway.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
