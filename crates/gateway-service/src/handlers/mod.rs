//! HTTP request handlers.

pub mod admin;
pub mod health;
pub mod metrics;
pub mod webhooks;

pub use admin::{list_companies, list_leads, list_users};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use webhooks::receive_webhook;
