//! Admin list handlers.
//!
//! Every handler checks the admin role before touching the data layer. The
//! identity is attached by the token admission stage.

use crate::auth::{require_admin, AuthenticatedIdentity};
use crate::errors::GatewayError;
use crate::models::{CompanyListParams, LeadListParams, ListResponse, Page, UserListParams};
use crate::repositories::{
    CompaniesRepository, LeadFilter, LeadsRepository, UserFilter, UsersRepository,
};
use crate::routes::AppState;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Blank filter values mean "no filter".
fn filter_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Handler for GET /v1/admin/users
///
/// Query parameters: `limit`, `offset`, `role`, `company_id`.
#[instrument(skip_all, name = "gateway.handlers.list_users")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Query(params): Query<UserListParams>,
) -> Result<Json<ListResponse>, GatewayError> {
    require_admin(&identity.role)?;

    let page = Page::resolve(params.limit.as_deref(), params.offset.as_deref())?;
    let filter = UserFilter {
        role: filter_value(params.role),
        company_id: filter_value(params.company_id),
    };

    let items = UsersRepository::list(state.executor.as_ref(), &filter, page).await?;

    tracing::debug!(target: "gateway.handlers.admin", count = items.len(), "Listed users");
    Ok(Json(ListResponse::new(items, page)))
}

/// Handler for GET /v1/admin/companies
///
/// Query parameters: `limit`, `offset`, `status`.
#[instrument(skip_all, name = "gateway.handlers.list_companies")]
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Query(params): Query<CompanyListParams>,
) -> Result<Json<ListResponse>, GatewayError> {
    require_admin(&identity.role)?;

    let page = Page::resolve(params.limit.as_deref(), params.offset.as_deref())?;
    let items =
        CompaniesRepository::list(state.executor.as_ref(), filter_value(params.status), page)
            .await?;

    Ok(Json(ListResponse::new(items, page)))
}

/// Handler for GET /v1/admin/leads
///
/// Query parameters: `limit`, `offset`, `status`, `category`.
#[instrument(skip_all, name = "gateway.handlers.list_leads")]
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<ListResponse>, GatewayError> {
    require_admin(&identity.role)?;

    let page = Page::resolve(params.limit.as_deref(), params.offset.as_deref())?;
    let filter = LeadFilter {
        status: filter_value(params.status),
        category: filter_value(params.category),
    };

    let items = LeadsRepository::list(state.executor.as_ref(), &filter, page).await?;

    Ok(Json(ListResponse::new(items, page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_value() {
        assert_eq!(filter_value(None), None);
        assert_eq!(filter_value(Some("  ".to_string())), None);
        assert_eq!(
            filter_value(Some(" active ".to_string())),
            Some("active".to_string())
        );
    }
}
