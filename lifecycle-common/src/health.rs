use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Health of a single service, computed on demand from its live state.
///
/// A service never reports `Healthy` while the resource or loop it depends on
/// is absent; a service whose background work is switched off by configuration
/// reports `Disabled`, which does not fail the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceHealth {
    Healthy,
    Disabled,
    Unhealthy(String),
}

impl ServiceHealth {
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        ServiceHealth::Unhealthy(reason.into())
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, ServiceHealth::Unhealthy(_))
    }
}

/// Combined health of every service run by a host: the process is healthy
/// only if no service is unhealthy.
#[derive(Default, Debug)]
pub struct HealthStatus {
    /// The overall status: true if no service is unhealthy
    pub healthy: bool,
    /// Current status of each registered service, for display
    pub components: HashMap<String, ServiceHealth>,
}

impl HealthStatus {
    pub fn from_components(components: HashMap<String, ServiceHealth>) -> Self {
        Self {
            healthy: components.values().all(ServiceHealth::is_live),
            components,
        }
    }
}

impl IntoResponse for HealthStatus {
    /// Computes the axum status code based on the overall health status,
    /// and prints each component status in the body for debugging.
    fn into_response(self) -> Response {
        let body = format!("{self:?}");
        match self.healthy {
            true => (StatusCode::OK, body),
            false => (StatusCode::INTERNAL_SERVER_ERROR, body),
        }
        .into_response()
    }
}
