//! Repository layer for the gateway.
//!
//! Read-only list queries for the admin routes. All queries are
//! parameterized and run through the `QueryExecutor` collaborator.

pub mod companies;
pub mod leads;
pub mod users;

pub use companies::CompaniesRepository;
pub use leads::{LeadFilter, LeadsRepository};
pub use users::{UserFilter, UsersRepository};
