//! Companies repository.
//!
//! Companies live in `company_profiles`.

use crate::errors::GatewayError;
use crate::models::Page;
use crate::services::query::{JsonRow, QueryArg, QueryExecutor};
use tracing::instrument;

const LIST_COMPANIES: &str = r#"
    SELECT to_jsonb(c) FROM (
        SELECT *
        FROM company_profiles
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
    ) c
"#;

/// Companies repository for database operations.
pub struct CompaniesRepository;

impl CompaniesRepository {
    /// List companies, newest first, optionally filtered by status.
    #[instrument(skip_all, name = "gateway.repo.list_companies")]
    pub async fn list(
        executor: &dyn QueryExecutor,
        status: Option<String>,
        page: Page,
    ) -> Result<Vec<JsonRow>, GatewayError> {
        executor
            .fetch_rows(
                LIST_COMPANIES,
                &[
                    QueryArg::OptText(status), // $1
                    QueryArg::Int(page.limit), // $2
                    QueryArg::Int(page.offset), // $3
                ],
            )
            .await
    }
}
