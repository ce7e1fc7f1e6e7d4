//! Relational query collaborator.
//!
//! Every statement run through [`QueryExecutor`] selects exactly one JSON
//! column (`to_jsonb(...)`), so callers get rows as JSON objects without a
//! per-table row type.

use crate::errors::GatewayError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPool, Postgres};
use sqlx::query::Query;
use sqlx::Row;
use tracing::instrument;

/// JSON object produced for one row.
pub type JsonRow = Map<String, Value>;

/// Positional query argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    Text(String),
    /// Bound as SQL NULL when `None`.
    OptText(Option<String>),
    Int(i64),
    Bool(bool),
}

/// Parameterized query execution.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` and return the first column of the first row, if any.
    ///
    /// A SQL NULL is returned as `None`.
    async fn fetch_scalar(&self, sql: &str, args: &[QueryArg])
        -> Result<Option<Value>, GatewayError>;

    /// Run `sql` and return every row's JSON object, in order.
    async fn fetch_rows(&self, sql: &str, args: &[QueryArg]) -> Result<Vec<JsonRow>, GatewayError>;
}

/// Postgres-backed executor.
pub struct PgQueryExecutor {
    pool: PgPool,
}

impl PgQueryExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_args<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &'q [QueryArg],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            QueryArg::Text(value) => query.bind(value.as_str()),
            QueryArg::OptText(value) => query.bind(value.as_deref()),
            QueryArg::Int(value) => query.bind(*value),
            QueryArg::Bool(value) => query.bind(*value),
        };
    }
    query
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    #[instrument(skip_all, name = "gateway.query.fetch_scalar")]
    async fn fetch_scalar(
        &self,
        sql: &str,
        args: &[QueryArg],
    ) -> Result<Option<Value>, GatewayError> {
        let row = bind_args(sqlx::query(sql), args)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<Value>, _>(0)?),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, name = "gateway.query.fetch_rows")]
    async fn fetch_rows(&self, sql: &str, args: &[QueryArg]) -> Result<Vec<JsonRow>, GatewayError> {
        let rows = bind_args(sqlx::query(sql), args)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| match row.try_get::<Value, _>(0)? {
                Value::Object(map) => Ok(map),
                other => {
                    tracing::error!(
                        target: "gateway.query",
                        kind = %json_kind(&other),
                        "Query returned a non-object row"
                    );
                    Err(GatewayError::Database(
                        "row is not a JSON object".to_string(),
                    ))
                }
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Mock query executor for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// One recorded call.
    #[derive(Debug, Clone)]
    pub struct RecordedQuery {
        pub sql: String,
        pub args: Vec<QueryArg>,
    }

    /// Mock executor returning canned results and recording every call.
    pub struct MockQueryExecutor {
        scalar: Option<Value>,
        rows: Vec<JsonRow>,
        return_error: bool,
        call_count: AtomicUsize,
        calls: Mutex<Vec<RecordedQuery>>,
    }

    impl MockQueryExecutor {
        /// Return no rows and no scalar.
        pub fn empty() -> Self {
            Self::with_rows(Vec::new())
        }

        /// Return `rows` from `fetch_rows`.
        pub fn with_rows(rows: Vec<JsonRow>) -> Self {
            Self {
                scalar: None,
                rows,
                return_error: false,
                call_count: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Return `value` from `fetch_scalar`.
        pub fn with_scalar(value: Value) -> Self {
            Self {
                scalar: Some(value),
                ..Self::empty()
            }
        }

        /// Fail every call with a database error.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::empty()
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Calls made so far, oldest first.
        pub fn calls(&self) -> Vec<RecordedQuery> {
            self.calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }

        fn record(&self, sql: &str, args: &[QueryArg]) -> Result<(), GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(RecordedQuery {
                    sql: sql.to_string(),
                    args: args.to_vec(),
                });
            }

            if self.return_error {
                return Err(GatewayError::Database(
                    "Mock query executor error".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QueryExecutor for MockQueryExecutor {
        async fn fetch_scalar(
            &self,
            sql: &str,
            args: &[QueryArg],
        ) -> Result<Option<Value>, GatewayError> {
            self.record(sql, args)?;
            Ok(self.scalar.clone())
        }

        async fn fetch_rows(
            &self,
            sql: &str,
            args: &[QueryArg],
        ) -> Result<Vec<JsonRow>, GatewayError> {
            self.record(sql, args)?;
            Ok(self.rows.clone())
        }
    }

}
