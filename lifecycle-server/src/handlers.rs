use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing, Json, Router};
use lifecycle_common::{metrics, HealthStatus, Host, HostError};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use crate::version::VersionInfo;

/// The process router: probes, version and metrics at the root, every hosted
/// service under its own base path.
pub fn app(host: Arc<Host>, metrics: Option<PrometheusHandle>) -> Result<Router, HostError> {
    let base = Router::new()
        .route("/", routing::get(index))
        .route("/version", routing::get(version))
        .route("/_readiness", routing::get(readiness))
        .route("/_liveness", routing::get(liveness))
        .route(
            "/metrics",
            routing::get(move || match metrics {
                Some(ref recorder_handle) => std::future::ready(recorder_handle.render()),
                None => std::future::ready("no metrics recorder installed".to_owned()),
            }),
        )
        .with_state(host.clone());

    Ok(host
        .router(base)?
        .layer(axum::middleware::from_fn(metrics::track_metrics))
        .layer(TraceLayer::new_for_http()))
}

pub async fn index() -> &'static str {
    "lifecycle server"
}

async fn version() -> Json<VersionInfo> {
    Json(VersionInfo::current())
}

async fn readiness(State(host): State<Arc<Host>>) -> StatusCode {
    host.readiness()
}

async fn liveness(State(host): State<Arc<Host>>) -> HealthStatus {
    host.health().await
}
