use async_trait::async_trait;
use axum::Router;

use crate::context::LifecycleContext;
use crate::error::{RegisterError, StartError, StopError};
use crate::health::ServiceHealth;

/// The narrow routing capability handed to [`Service::register`].
pub trait RouteRegistrar {
    /// Mount `router` so its routes are served under `base_path`.
    fn mount(&mut self, base_path: &str, router: Router) -> Result<(), RegisterError>;
}

/// A subsystem whose background work or external resource is driven by the host.
///
/// The host calls [`start`](Service::start) once at boot, in registration order,
/// and [`stop`](Service::stop) once at shutdown, in reverse order. `stop` must be
/// safe to call when `start` never ran or failed, and must return once `ctx`
/// is done even if the service's own work has not finished.
#[async_trait]
pub trait Service: Send + Sync {
    /// Stable identifier, used in logs, metrics and health reports.
    fn name(&self) -> &'static str;

    /// Mount the service's HTTP surface. Handlers must answer with a 5xx while the
    /// service is not running instead of failing the process.
    fn register(&self, routes: &mut dyn RouteRegistrar) -> Result<(), RegisterError>;

    async fn start(&self, ctx: &LifecycleContext) -> Result<(), StartError>;

    async fn stop(&self, ctx: &LifecycleContext) -> Result<(), StopError>;

    /// Current health, computed from live state.
    async fn health(&self) -> ServiceHealth;
}
