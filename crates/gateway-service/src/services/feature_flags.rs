//! Feature flag lookups.
//!
//! # Fail-open
//!
//! [`FeatureGate::is_enabled`] never errors. A store failure, a missing
//! row, or a malformed value all count as enabled, so an outage of the flag
//! subsystem cannot take down the gated routes. Every fail-open decision is
//! logged at warn and counted.

use crate::errors::GatewayError;
use crate::observability::metrics::record_feature_flag_lookup;
use crate::services::query::{QueryArg, QueryExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

const FLAG_QUERY: &str =
    "SELECT to_jsonb(is_enabled) FROM feature_flags WHERE name = $1 LIMIT 1";

/// Source of feature flag state.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Look up a flag. `Ok(None)` means the flag has no row.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or the stored value
    /// is not a boolean.
    async fn lookup(&self, flag_name: &str) -> Result<Option<bool>, GatewayError>;
}

/// Flag store backed by the `feature_flags` table.
pub struct SqlFlagStore {
    executor: Arc<dyn QueryExecutor>,
}

impl SqlFlagStore {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl FlagStore for SqlFlagStore {
    async fn lookup(&self, flag_name: &str) -> Result<Option<bool>, GatewayError> {
        let value = self
            .executor
            .fetch_scalar(FLAG_QUERY, &[QueryArg::Text(flag_name.to_string())])
            .await?;

        match value {
            None => Ok(None),
            Some(Value::Bool(enabled)) => Ok(Some(enabled)),
            Some(_) => Err(GatewayError::Database(format!(
                "feature flag '{flag_name}' is not a boolean"
            ))),
        }
    }
}

/// Decides whether a gated route family is currently enabled.
///
/// Holds no cache: every call queries the store.
pub struct FeatureGate {
    store: Arc<dyn FlagStore>,
}

impl FeatureGate {
    pub fn new(store: Arc<dyn FlagStore>) -> Self {
        Self { store }
    }

    /// Returns the stored state of `flag_name`, or `true` if it cannot be
    /// determined.
    #[instrument(skip(self), name = "gateway.feature_gate.is_enabled")]
    pub async fn is_enabled(&self, flag_name: &str) -> bool {
        match self.store.lookup(flag_name).await {
            Ok(Some(true)) => {
                record_feature_flag_lookup("enabled");
                true
            }
            Ok(Some(false)) => {
                tracing::debug!(target: "gateway.feature_gate", flag = %flag_name, "Feature disabled");
                record_feature_flag_lookup("disabled");
                false
            }
            Ok(None) => {
                tracing::warn!(target: "gateway.feature_gate", flag = %flag_name, "Feature flag not found, failing open");
                record_feature_flag_lookup("fail_open");
                true
            }
            Err(e) => {
                tracing::warn!(target: "gateway.feature_gate", flag = %flag_name, error = %e, "Feature flag lookup failed, failing open");
                record_feature_flag_lookup("fail_open");
                true
            }
        }
    }
}

/// Mock flag store for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Value(Option<bool>),
        Fail,
    }

    /// Mock flag store returning one fixed answer.
    pub struct MockFlagStore {
        behavior: Behavior,
        call_count: AtomicUsize,
    }

    impl MockFlagStore {
        fn with_behavior(behavior: Behavior) -> Self {
            Self {
                behavior,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Every flag is enabled.
        pub fn enabled() -> Self {
            Self::with_behavior(Behavior::Value(Some(true)))
        }

        /// Every flag is disabled.
        pub fn disabled() -> Self {
            Self::with_behavior(Behavior::Value(Some(false)))
        }

        /// No flag has a row.
        pub fn absent() -> Self {
            Self::with_behavior(Behavior::Value(None))
        }

        /// Every lookup errors.
        pub fn failing() -> Self {
            Self::with_behavior(Behavior::Fail)
        }

        /// Get the number of lookups made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FlagStore for MockFlagStore {
        async fn lookup(&self, _flag_name: &str) -> Result<Option<bool>, GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Value(value) => Ok(value),
                Behavior::Fail => Err(GatewayError::Database(
                    "Mock flag store error".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockFlagStore;
    use super::*;
    use crate::services::query::mock::MockQueryExecutor;
    use serde_json::json;

    #[tokio::test]
    async fn test_gate_follows_store_value() {
        assert!(FeatureGate::new(Arc::new(MockFlagStore::enabled())).is_enabled("api_gateway").await);
        assert!(!FeatureGate::new(Arc::new(MockFlagStore::disabled())).is_enabled("api_gateway").await);
    }

    #[tokio::test]
    async fn test_gate_fails_open_on_store_error() {
        let store = Arc::new(MockFlagStore::failing());
        let gate = FeatureGate::new(store.clone());

        assert!(gate.is_enabled("api_gateway").await);
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_gate_fails_open_on_missing_flag() {
        let gate = FeatureGate::new(Arc::new(MockFlagStore::absent()));
        assert!(gate.is_enabled("api_gateway").await);
    }

    #[tokio::test]
    async fn test_gate_does_not_cache() {
        let store = Arc::new(MockFlagStore::disabled());
        let gate = FeatureGate::new(store.clone());

        for _ in 0..3 {
            assert!(!gate.is_enabled("api_gateway").await);
        }
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn test_sql_store_binds_flag_name() {
        let executor = Arc::new(MockQueryExecutor::with_scalar(json!(false)));
        let store = SqlFlagStore::new(executor.clone());

        assert_eq!(store.lookup("api_gateway").await.unwrap(), Some(false));

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].sql.contains("to_jsonb(is_enabled)"));
        assert!(calls[0].sql.contains("FROM feature_flags WHERE name = $1"));
        assert_eq!(calls[0].args, vec![QueryArg::Text("api_gateway".to_string())]);
    }

    #[tokio::test]
    async fn test_sql_store_missing_row() {
        let store = SqlFlagStore::new(Arc::new(MockQueryExecutor::empty()));
        assert_eq!(store.lookup("api_gateway").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sql_store_rejects_non_boolean() {
        let store = SqlFlagStore::new(Arc::new(MockQueryExecutor::with_scalar(json!("yes"))));
        assert!(matches!(
            store.lookup("api_gateway").await,
            Err(GatewayError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_gate_over_failing_database_fails_open() {
        let store = SqlFlagStore::new(Arc::new(MockQueryExecutor::failing()));
        let gate = FeatureGate::new(Arc::new(store));
        assert!(gate.is_enabled("api_gateway").await);
    }
}
