//! Leads repository.
//!
//! `status` is the `lead_status` enum and is compared as text.

use crate::errors::GatewayError;
use crate::models::Page;
use crate::services::query::{JsonRow, QueryArg, QueryExecutor};
use tracing::instrument;

const LIST_LEADS: &str = r#"
    SELECT to_jsonb(l) FROM (
        SELECT *
        FROM leads
        WHERE ($1::text IS NULL OR status::text = $1)
          AND ($2::text IS NULL OR category = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
    ) l
"#;

/// Optional filters for the lead list.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<String>,
    pub category: Option<String>,
}

/// Leads repository for database operations.
pub struct LeadsRepository;

impl LeadsRepository {
    /// List leads, newest first.
    #[instrument(skip_all, name = "gateway.repo.list_leads")]
    pub async fn list(
        executor: &dyn QueryExecutor,
        filter: &LeadFilter,
        page: Page,
    ) -> Result<Vec<JsonRow>, GatewayError> {
        executor
            .fetch_rows(
                LIST_LEADS,
                &[
                    QueryArg::OptText(filter.status.clone()), // $1
                    QueryArg::OptText(filter.category.clone()), // $2
                    QueryArg::Int(page.limit), // $3
                    QueryArg::Int(page.offset), // $4
                ],
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::query::mock::MockQueryExecutor;

    #[tokio::test]
    async fn test_list_propagates_database_errors() {
        let executor = MockQueryExecutor::failing();

        let result =
            LeadsRepository::list(&executor, &LeadFilter::default(), Page { limit: 50, offset: 0 })
                .await;

        assert!(matches!(result, Err(GatewayError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_binds_filters() {
        let executor = MockQueryExecutor::empty();
        let filter = LeadFilter {
            status: None,
            category: Some("roofing".to_string()),
        };

        LeadsRepository::list(&executor, &filter, Page { limit: 50, offset: 100 })
            .await
            .unwrap();

        let calls = executor.calls();
        assert!(calls[0].sql.contains("FROM leads"));
        assert!(calls[0].sql.contains("status::text = $1"));
        assert_eq!(calls[0].args[1], QueryArg::OptText(Some("roofing".to_string())));
        assert_eq!(calls[0].args[3], QueryArg::Int(100));
    }
}
