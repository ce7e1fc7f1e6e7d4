//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: ~8 values (parameterized paths)
//! - `status`: small fixed sets per metric
//!
//! Webhook partner names are NOT used as labels; they are caller-controlled.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // HTTP request buckets aligned with a 200ms p95 target
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gateway_http_requests_total`, `gateway_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures every response, including rejections from the admission
/// pipeline and framework-level 404/405.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gateway_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gateway_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/metrics" | "/v1/health" | "/v1/admin/users" | "/v1/admin/companies"
        | "/v1/admin/leads" => path.to_string(),
        _ if path.starts_with("/v1/webhooks/") => "/v1/webhooks/{partner}".to_string(),
        // Unknown paths normalized to "/other" to bound cardinality
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Admission Metrics
// ============================================================================

/// Record a key set refresh.
///
/// Metric: `gateway_jwks_refresh_total`
/// Labels: `status` ("success", "error")
pub fn record_jwks_refresh(status: &str) {
    counter!("gateway_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a bearer token verification outcome.
///
/// Metric: `gateway_token_validations_total`
/// Labels: `status` ("success", "rejected", "unavailable")
pub fn record_token_validation(status: &str) {
    counter!("gateway_token_validations_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a feature flag lookup.
///
/// Metric: `gateway_feature_flag_lookups_total`
/// Labels: `status` ("enabled", "disabled", "fail_open")
pub fn record_feature_flag_lookup(status: &str) {
    counter!("gateway_feature_flag_lookups_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a webhook signature check.
///
/// Metric: `gateway_webhook_verifications_total`
/// Labels: `status` ("valid", "invalid", "missing")
pub fn record_webhook_verification(status: &str) {
    counter!("gateway_webhook_verifications_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_record_http_request() {
        // Records to the global no-op recorder; must not panic
        record_http_request("GET", "/v1/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/v1/admin/users", 401, Duration::from_millis(10));
        record_http_request("POST", "/v1/webhooks/acme", 200, Duration::from_millis(20));
        record_http_request("GET", "/v1/admin/leads", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(503), "error");
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/v1/health"), "/v1/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/v1/admin/companies"), "/v1/admin/companies");
        assert_eq!(
            normalize_endpoint("/v1/webhooks/acme"),
            "/v1/webhooks/{partner}"
        );
        assert_eq!(
            normalize_endpoint("/v1/webhooks/another-partner"),
            "/v1/webhooks/{partner}"
        );
        assert_eq!(normalize_endpoint("/v1/admin/users/17"), "/other");
        assert_eq!(normalize_endpoint("/wp-login.php"), "/other");
    }

    #[test]
    fn test_admission_counters_are_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_jwks_refresh("success");
            record_token_validation("rejected");
            record_feature_flag_lookup("fail_open");
            record_feature_flag_lookup("fail_open");
            record_webhook_verification("invalid");
        });

        let counters: Vec<(String, u64)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count) => Some((key.key().name().to_string(), count)),
                _ => None,
            })
            .collect();

        assert!(counters.contains(&("gateway_jwks_refresh_total".to_string(), 1)));
        assert!(counters.contains(&("gateway_token_validations_total".to_string(), 1)));
        assert!(counters.contains(&("gateway_feature_flag_lookups_total".to_string(), 2)));
        assert!(counters.contains(&("gateway_webhook_verifications_total".to_string(), 1)));
    }
}
