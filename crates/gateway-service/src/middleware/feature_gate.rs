//! Feature flag admission stage.
//!
//! A disabled flag rejects with `FeatureDisabled`, which renders as the same
//! bare 404 as an unknown route.

use crate::errors::GatewayError;
use crate::middleware::pipeline::AdmissionStage;
use crate::services::FeatureGate;
use async_trait::async_trait;
use axum::extract::Request;
use std::sync::Arc;

/// Admission stage gating a route family on one flag.
pub struct FeatureGateStage {
    gate: Arc<FeatureGate>,
    flag_name: String,
}

impl FeatureGateStage {
    pub fn new(gate: Arc<FeatureGate>, flag_name: impl Into<String>) -> Self {
        Self {
            gate,
            flag_name: flag_name.into(),
        }
    }
}

#[async_trait]
impl AdmissionStage for FeatureGateStage {
    fn name(&self) -> &'static str {
        "feature_gate"
    }

    async fn admit(&self, _req: &mut Request) -> Result<(), GatewayError> {
        if self.gate.is_enabled(&self.flag_name).await {
            Ok(())
        } else {
            Err(GatewayError::FeatureDisabled)
        }
    }
}
