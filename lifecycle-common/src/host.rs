//! Orchestrates the services of one process: route mounting, ordered start,
//! reverse-ordered stop under one overall deadline, readiness and liveness.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::LifecycleContext;
use crate::error::{HostError, RegisterError, StopError};
use crate::health::HealthStatus;
use crate::metrics;
use crate::service::{RouteRegistrar, Service};

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Host {
    name: String,
    services: Vec<Arc<dyn Service>>,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl Host {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            services: Vec::new(),
            shutdown_token: CancellationToken::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Add a service; services start in the order they are added.
    pub fn with_service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.push(service);
        self
    }

    /// Overall ceiling on [`stop_all`](Host::stop_all), shared by every service.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// Cancelled once shutdown begins. Also cancels any start still in flight.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Future that resolves when shutdown begins; pass to `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn shutdown_signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let token = self.shutdown_token.clone();
        async move {
            token.cancelled().await;
        }
    }

    /// Mount every service's routes on top of `base`.
    pub fn router(&self, base: Router) -> Result<Router, HostError> {
        let mut registrar = PathRegistrar::new(base);
        for service in &self.services {
            service
                .register(&mut registrar)
                .map_err(|source| HostError::Register {
                    service: service.name(),
                    source,
                })?;
        }
        Ok(registrar.into_router())
    }

    /// Start every service in registration order. If one fails, the services
    /// already started are stopped again, in reverse order, before returning.
    pub async fn start_all(&self) -> Result<(), HostError> {
        let ctx = LifecycleContext::from_token(self.shutdown_token.child_token());

        for (index, service) in self.services.iter().enumerate() {
            info!(service = service.name(), "starting service");
            match service.start(&ctx).await {
                Ok(()) => {
                    metrics::emit_service_start(&self.name, service.name(), "started");
                    info!(service = service.name(), "service started");
                }
                Err(source) => {
                    metrics::emit_service_start(&self.name, service.name(), "failed");
                    error!(service = service.name(), error = %source, "service failed to start");

                    let rollback = LifecycleContext::new().with_timeout(self.shutdown_timeout);
                    let started = self.services[..index].iter().rev();
                    if let Err(e) = self.stop_services(started, &rollback).await {
                        warn!(error = %e, "failed to stop services started before the failure");
                    }
                    return Err(HostError::StartFailed {
                        service: service.name(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Begin shutdown and stop every service in reverse registration order. Each
    /// service is asked to stop even if an earlier one failed; all of them share
    /// one deadline.
    pub async fn stop_all(&self) -> Result<(), HostError> {
        self.shutdown_token.cancel();
        info!(
            host = %self.name,
            timeout_secs = self.shutdown_timeout.as_secs_f64(),
            "shutting down services"
        );

        let ctx = LifecycleContext::new().with_timeout(self.shutdown_timeout);
        let result = self.stop_services(self.services.iter().rev(), &ctx).await;
        match &result {
            Ok(()) => info!(host = %self.name, "shutdown complete"),
            Err(e) => warn!(host = %self.name, error = %e, "shutdown complete with failures"),
        }
        result
    }

    async fn stop_services<'a, I>(&self, services: I, ctx: &LifecycleContext) -> Result<(), HostError>
    where
        I: Iterator<Item = &'a Arc<dyn Service>>,
    {
        let mut failures = Vec::new();
        for service in services {
            let started = Instant::now();
            let result = service.stop(ctx).await;
            let elapsed = started.elapsed().as_secs_f64();
            match result {
                Ok(()) => {
                    metrics::emit_service_stop(&self.name, service.name(), "completed", elapsed);
                    info!(service = service.name(), duration_secs = elapsed, "service stopped");
                }
                Err(e) => {
                    let outcome = match &e {
                        StopError::Timeout { .. } => "timeout",
                        StopError::Resource(_) => "failed",
                    };
                    metrics::emit_service_stop(&self.name, service.name(), outcome, elapsed);
                    warn!(service = service.name(), error = %e, result = outcome, "service failed to stop");
                    failures.push((service.name(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HostError::StopFailed { failures })
        }
    }

    /// Returns OK or SERVICE_UNAVAILABLE based on the shutdown token; no I/O.
    pub fn readiness(&self) -> StatusCode {
        if self.shutdown_token.is_cancelled() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        }
    }

    /// Health of every service, keyed by name.
    pub async fn health(&self) -> HealthStatus {
        let mut components = HashMap::with_capacity(self.services.len());
        for service in &self.services {
            components.insert(service.name().to_owned(), service.health().await);
        }
        HealthStatus::from_components(components)
    }
}

/// Nests each service router under its base path, refusing overlapping mounts
/// instead of letting the router panic on them.
struct PathRegistrar {
    router: Router,
    mounted: Vec<String>,
}

impl PathRegistrar {
    fn new(router: Router) -> Self {
        Self {
            router,
            mounted: Vec::new(),
        }
    }

    fn into_router(self) -> Router {
        self.router
    }
}

impl RouteRegistrar for PathRegistrar {
    fn mount(&mut self, base_path: &str, router: Router) -> Result<(), RegisterError> {
        let path = base_path.trim_end_matches('/');
        if !base_path.starts_with('/') || path.is_empty() {
            return Err(RegisterError::InvalidPath {
                path: base_path.to_owned(),
                reason: "must start with '/' and name at least one segment",
            });
        }

        if let Some(existing) = self.mounted.iter().find(|m| overlaps(m, path)) {
            return Err(RegisterError::RouteConflict {
                path: path.to_owned(),
                existing: existing.clone(),
            });
        }

        self.router = std::mem::take(&mut self.router).nest(path, router);
        self.mounted.push(path.to_owned());
        Ok(())
    }
}

/// True if one path is the other or a segment-wise prefix of it.
fn overlaps(a: &str, b: &str) -> bool {
    let is_prefix = |short: &str, long: &str| {
        long.strip_prefix(short)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };
    is_prefix(a, b) || is_prefix(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registrar() -> PathRegistrar {
        PathRegistrar::new(Router::new())
    }

    #[test]
    fn mounts_disjoint_paths() {
        let mut routes = registrar();

        assert!(routes.mount("/api/database", Router::new()).is_ok());
        assert!(routes.mount("/api/worker/", Router::new()).is_ok());
        assert!(routes.mount("/api/workers", Router::new()).is_ok());
    }

    #[test]
    fn rejects_duplicate_and_nested_paths() {
        let mut routes = registrar();
        routes.mount("/api/worker", Router::new()).unwrap();

        assert_eq!(
            routes.mount("/api/worker", Router::new()),
            Err(RegisterError::RouteConflict {
                path: "/api/worker".to_string(),
                existing: "/api/worker".to_string(),
            })
        );
        assert!(matches!(
            routes.mount("/api", Router::new()),
            Err(RegisterError::RouteConflict { .. })
        ));
        assert!(matches!(
            routes.mount("/api/worker/jobs", Router::new()),
            Err(RegisterError::RouteConflict { .. })
        ));
    }

    #[test]
    fn rejects_root_and_relative_paths() {
        let mut routes = registrar();

        assert!(matches!(
            routes.mount("/", Router::new()),
            Err(RegisterError::InvalidPath { .. })
        ));
        assert!(matches!(
            routes.mount("api", Router::new()),
            Err(RegisterError::InvalidPath { .. })
        ));
    }
}
