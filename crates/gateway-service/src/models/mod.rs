//! Gateway models.
//!
//! Request parameters and response bodies for the `/v1` routes.

use crate::errors::GatewayError;
use crate::services::query::JsonRow;
use serde::{Deserialize, Serialize};

/// Default page size for admin lists.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page size an admin list returns.
pub const MAX_LIMIT: i64 = 200;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: String,

    pub environment: String,

    pub version: String,
}

/// Resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Resolve raw `limit` and `offset` query values.
    ///
    /// `limit` defaults to 50 and is clamped to 1..=200; `offset` defaults
    /// to 0.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::BadRequest` when either value is not an
    /// integer or `offset` is negative.
    pub fn resolve(limit: Option<&str>, offset: Option<&str>) -> Result<Self, GatewayError> {
        let limit = match limit {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| GatewayError::BadRequest("limit must be an integer".to_string()))?
                .clamp(1, MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };

        let offset = match offset {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| GatewayError::BadRequest("offset must be an integer".to_string()))?,
            None => 0,
        };

        if offset < 0 {
            return Err(GatewayError::BadRequest(
                "offset must not be negative".to_string(),
            ));
        }

        Ok(Self { limit, offset })
    }
}

/// Query parameters for `GET /v1/admin/users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub role: Option<String>,
    pub company_id: Option<String>,
}

/// Query parameters for `GET /v1/admin/companies`.
#[derive(Debug, Default, Deserialize)]
pub struct CompanyListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub status: Option<String>,
}

/// Query parameters for `GET /v1/admin/leads`.
#[derive(Debug, Default, Deserialize)]
pub struct LeadListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
}

/// Page of rows returned by the admin list routes.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub items: Vec<JsonRow>,
    pub limit: i64,
    pub offset: i64,
    /// Number of items in this page.
    pub count: usize,
}

impl ListResponse {
    pub fn new(items: Vec<JsonRow>, page: Page) -> Self {
        Self {
            count: items.len(),
            items,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Acknowledgement for an accepted webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub partner: String,
}
