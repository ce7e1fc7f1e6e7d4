//! Service layer for the gateway.
//!
//! # Components
//!
//! - `query` - Parameterized query execution against Postgres
//! - `feature_flags` - Flag store and the fail-open feature gate

pub mod feature_flags;
pub mod query;

pub use feature_flags::{FeatureGate, FlagStore, SqlFlagStore};
pub use query::{PgQueryExecutor, QueryArg, QueryExecutor};
// Mocks exposed for integration tests
#[allow(unused_imports)]
pub use feature_flags::mock::MockFlagStore;
#[allow(unused_imports)]
pub use query::mock::MockQueryExecutor;
