//! Shared lifecycle plumbing for services hosted in one process: typed
//! configuration bindings, the `Service` start/stop contract, the host that
//! drives it, health aggregation and metrics.

pub mod api;
pub mod config;
pub mod context;
pub mod counters;
pub mod error;
pub mod health;
pub mod host;
pub mod metrics;
pub mod service;
pub mod signals;

pub use api::{ApiError, ErrorResponse};
pub use config::{Binding, ConfigError, EnvDuration, FlexBool};
pub use context::{ContextError, LifecycleContext};
pub use counters::Counters;
pub use error::{BoxError, HostError, RegisterError, StartError, StopError};
pub use health::{HealthStatus, ServiceHealth};
pub use host::Host;
pub use service::{RouteRegistrar, Service};
