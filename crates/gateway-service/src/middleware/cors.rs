//! Cross-origin policy.
//!
//! The origin list comes from a comma-delimited setting. An empty setting
//! allows any origin; credentials are always allowed.

use axum::http::{header, HeaderName, HeaderValue, Method};
use std::collections::BTreeSet;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origin set entry meaning "any origin".
pub const ANY_ORIGIN: &str = "*";

/// Parse the configured origin list.
///
/// Entries are trimmed and empty entries dropped. An effectively empty
/// list yields `{"*"}`.
pub fn allowed_origins(config: &str) -> BTreeSet<String> {
    let origins: BTreeSet<String> = config
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect();

    if origins.is_empty() {
        return BTreeSet::from([ANY_ORIGIN.to_string()]);
    }
    origins
}

/// Build the CORS layer for an origin set.
///
/// With credentials allowed, browsers refuse a literal `*`, so the
/// wildcard is served by echoing the request's `Origin`.
pub fn build_cors_layer(origins: &BTreeSet<String>) -> CorsLayer {
    let allow_origin = if origins.contains(ANY_ORIGIN) {
        AllowOrigin::mirror_request()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(target: "gateway.cors", origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(crate::auth::webhook::SIGNATURE_HEADER),
        ])
        .max_age(Duration::from_secs(600))
}
