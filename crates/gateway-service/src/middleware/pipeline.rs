//! Request admission pipeline.
//!
//! An ordered list of admission stages runs before routing. Each stage
//! carries a [`StageScope`] deciding, from the request path alone, whether
//! the stage applies. The first failing stage rejects the request; later
//! stages do not run.
//!
//! ```text
//! Received -> (Exempt | Admitted) per stage, in order -> Routed
//!                       \-> Rejected
//! ```
//!
//! CORS decoration is not a stage: it is the outer `CorsLayer`, so it also
//! decorates rejections.

use crate::errors::GatewayError;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// One admission check.
#[async_trait]
pub trait AdmissionStage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Admit or reject the request. May attach data to the request
    /// extensions for later stages and handlers.
    async fn admit(&self, req: &mut Request) -> Result<(), GatewayError>;
}

/// Paths a stage applies to: everything under one prefix, minus exemptions.
#[derive(Debug, Clone)]
pub struct StageScope {
    protected_prefix: String,
    exempt_exact: Vec<String>,
    exempt_prefixes: Vec<String>,
}

impl StageScope {
    /// Apply to every path under `prefix`.
    pub fn under(prefix: impl Into<String>) -> Self {
        Self {
            protected_prefix: prefix.into(),
            exempt_exact: Vec::new(),
            exempt_prefixes: Vec::new(),
        }
    }

    /// Exempt one exact path.
    pub fn except(mut self, path: impl Into<String>) -> Self {
        self.exempt_exact.push(path.into());
        self
    }

    /// Exempt every path under `prefix`.
    pub fn except_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.exempt_prefixes.push(prefix.into());
        self
    }

    pub fn applies_to(&self, path: &str) -> bool {
        path.starts_with(&self.protected_prefix)
            && !self.exempt_exact.iter().any(|exempt| exempt == path)
            && !self
                .exempt_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Ordered admission stages.
#[derive(Default)]
pub struct AdmissionPipeline {
    stages: Vec<(Arc<dyn AdmissionStage>, StageScope)>,
}

impl AdmissionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages run in insertion order.
    pub fn stage(mut self, stage: Arc<dyn AdmissionStage>, scope: StageScope) -> Self {
        self.stages.push((stage, scope));
        self
    }

    /// Names of the configured stages, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(stage, _)| stage.name()).collect()
    }

    /// Run every applicable stage against `req`.
    ///
    /// # Errors
    ///
    /// Returns the first stage rejection.
    pub async fn admit(&self, req: &mut Request) -> Result<(), GatewayError> {
        let path = req.uri().path().to_string();

        for (stage, scope) in &self.stages {
            if !scope.applies_to(&path) {
                tracing::trace!(target: "gateway.pipeline", stage = stage.name(), path = %path, "Exempt");
                continue;
            }

            if let Err(e) = stage.admit(req).await {
                tracing::debug!(
                    target: "gateway.pipeline",
                    stage = stage.name(),
                    status = e.status_code(),
                    "Request rejected"
                );
                return Err(e);
            }
            tracing::trace!(target: "gateway.pipeline", stage = stage.name(), "Admitted");
        }

        Ok(())
    }
}

/// Axum middleware running the admission pipeline.
#[instrument(skip_all, name = "gateway.middleware.admission")]
pub async fn run_admission(
    State(pipeline): State<Arc<AdmissionPipeline>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    pipeline.admit(&mut req).await?;
    Ok(next.run(req).await)
}
