//! Partner webhook receiver.
//!
//! The body is taken as raw bytes and its signature verified before any
//! parsing. Webhook paths are exempt from token and feature gate stages;
//! the signature is the only authentication.

use crate::auth::webhook::{verify_signature, SIGNATURE_HEADER};
use crate::errors::GatewayError;
use crate::models::WebhookAck;
use crate::observability::metrics::record_webhook_verification;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Longest accepted partner identifier.
const MAX_PARTNER_LEN: usize = 64;

fn is_valid_partner(partner: &str) -> bool {
    !partner.is_empty()
        && partner.len() <= MAX_PARTNER_LEN
        && partner
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Handler for POST /v1/webhooks/:partner
///
/// # Response
///
/// - 200 `{"received": true, "partner": ...}` on a valid signature and JSON body
/// - 400 for an invalid partner name or a non-JSON body
/// - 401 when `X-Signature` is missing or does not match
#[instrument(skip_all, name = "gateway.handlers.webhook")]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Path(partner): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, GatewayError> {
    if !is_valid_partner(&partner) {
        return Err(GatewayError::BadRequest("Invalid partner".to_string()));
    }

    let Some(provided) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::debug!(target: "gateway.webhooks", "Missing signature header");
        record_webhook_verification("missing");
        return Err(GatewayError::SignatureMismatch);
    };

    let secret = state.config.webhook_hmac_secret.expose_secret().as_bytes();
    if !verify_signature(&body, secret, provided) {
        tracing::warn!(target: "gateway.webhooks", "Webhook signature mismatch");
        record_webhook_verification("invalid");
        return Err(GatewayError::SignatureMismatch);
    }
    record_webhook_verification("valid");

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "gateway.webhooks", error = %e, "Webhook body is not JSON");
        GatewayError::BadRequest("Webhook body must be JSON".to_string())
    })?;

    tracing::info!(
        target: "gateway.webhooks",
        partner = %partner,
        bytes = body.len(),
        event = payload.get("event").and_then(|e| e.as_str()).unwrap_or("unknown"),
        "Webhook received"
    );

    Ok(Json(WebhookAck {
        received: true,
        partner,
    }))
}
