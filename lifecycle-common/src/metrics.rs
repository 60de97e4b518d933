use std::time::Instant;

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse,
    Router,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const METRIC_SERVICE_START: &str = "lifecycle_service_start_total";
pub const METRIC_SERVICE_STOP: &str = "lifecycle_service_stop_total";
pub const METRIC_SERVICE_STOP_DURATION: &str = "lifecycle_service_stop_duration_seconds";

/// Bind a `TcpListener` on the provided bind address to serve a `Router` on it,
/// until `shutdown` resolves.
pub async fn serve<F>(router: Router, bind: &str, shutdown: F) -> Result<(), std::io::Error>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Install the global prometheus recorder; render it from a `/metrics` route.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}

/// Middleware to record some common HTTP metrics
/// Someday tower-http might provide a metrics middleware: https://github.com/tower-rs/tower-http/issues/57
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    let method = req.method().clone();

    // Run the rest of the request handling first, so we can measure it and get response
    // codes.
    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels).record(latency);

    response
}

pub(crate) fn emit_service_start(host: &str, service: &str, result: &str) {
    metrics::counter!(
        METRIC_SERVICE_START,
        "host" => host.to_string(),
        "service" => service.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_service_stop(host: &str, service: &str, result: &str, duration_secs: f64) {
    metrics::counter!(
        METRIC_SERVICE_STOP,
        "host" => host.to_string(),
        "service" => service.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
    metrics::histogram!(
        METRIC_SERVICE_STOP_DURATION,
        "host" => host.to_string(),
        "service" => service.to_string(),
        "result" => result.to_string()
    )
    .record(duration_secs);
}
