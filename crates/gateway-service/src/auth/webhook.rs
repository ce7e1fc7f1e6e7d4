//! Webhook signature verification.
//!
//! Partners sign the raw request body with HMAC-SHA256 under a shared
//! secret and send the lowercase hex digest in `X-Signature`.
//!
//! # Security
//!
//! - The digest is compared in constant time on its hex form, so a
//!   case-altered signature does not match
//! - An empty secret never verifies

use ring::hmac;
use subtle::ConstantTimeEq;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Compute the lowercase hex HMAC-SHA256 of `raw_body` under `secret`.
pub fn compute_signature(raw_body: &[u8], secret: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hex::encode(hmac::sign(&key, raw_body).as_ref())
}

/// Check `provided_signature` against the HMAC of `raw_body`.
///
/// Returns `false` on any mismatch; never errors.
pub fn verify_signature(raw_body: &[u8], secret: &[u8], provided_signature: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!(target: "gateway.auth.webhook", "Webhook secret not configured, rejecting");
        return false;
    }

    let expected = compute_signature(raw_body, secret);

    // Unequal lengths compare unequal
    expected
        .as_bytes()
        .ct_eq(provided_signature.as_bytes())
        .into()
}
