//! Role checks for administrative routes.

use crate::errors::GatewayError;

/// Roles allowed on `/v1/admin/*`.
pub const ADMIN_ROLES: &[&str] = &["admin", "master_admin"];

/// Require an administrative role.
///
/// Comparison is exact; roles arrive lowercased from the token verifier.
///
/// # Errors
///
/// Returns `GatewayError::Forbidden` for any other role, including empty.
pub fn require_admin(role: &str) -> Result<(), GatewayError> {
    if ADMIN_ROLES.contains(&role) {
        return Ok(());
    }

    tracing::debug!(target: "gateway.auth.rbac", role = %role, "Admin role required");
    Err(GatewayError::Forbidden("Admin role required".to_string()))
}
