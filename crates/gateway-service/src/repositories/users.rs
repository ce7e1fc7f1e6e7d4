//! Users repository.
//!
//! Users live in `user_profiles`; rows are returned whole as JSON objects.
//! `company_id` is a uuid, so it is compared as text.

use crate::errors::GatewayError;
use crate::models::Page;
use crate::services::query::{JsonRow, QueryArg, QueryExecutor};
use tracing::instrument;

const LIST_USERS: &str = r#"
    SELECT to_jsonb(p) FROM (
        SELECT *
        FROM user_profiles
        WHERE ($1::text IS NULL OR role = $1)
          AND ($2::text IS NULL OR company_id::text = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
    ) p
"#;

/// Optional filters for the user list.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<String>,
    pub company_id: Option<String>,
}

/// Users repository for database operations.
pub struct UsersRepository;

impl UsersRepository {
    /// List users, newest first.
    #[instrument(skip_all, name = "gateway.repo.list_users")]
    pub async fn list(
        executor: &dyn QueryExecutor,
        filter: &UserFilter,
        page: Page,
    ) -> Result<Vec<JsonRow>, GatewayError> {
        executor
            .fetch_rows(
                LIST_USERS,
                &[
                    QueryArg::OptText(filter.role.clone()), // $1
                    QueryArg::OptText(filter.company_id.clone()), // $2
                    QueryArg::Int(page.limit), // $3
                    QueryArg::Int(page.offset), // $4
                ],
            )
            .await
    }
}
