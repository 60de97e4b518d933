//! Errors returned by lifecycle hooks and the host.

use std::time::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Returned by [`Service::start`](crate::Service::start). A service that fails to
/// start is left not running, with no resource reachable from its handlers.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("failed to acquire resource: {0}")]
    Resource(#[source] BoxError),
    #[error("service already started")]
    AlreadyStarted,
}

impl StartError {
    pub fn resource<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StartError::Resource(Box::new(error))
    }
}

/// Returned by [`Service::stop`](crate::Service::stop).
#[derive(Error, Debug)]
pub enum StopError {
    /// Background work did not finish before the caller's deadline. The service
    /// has stopped waiting; whether to escalate is up to the caller.
    #[error("timed out after {waited:?} waiting for background work to finish")]
    Timeout { waited: Duration },
    #[error("failed to release resource: {0}")]
    Resource(#[source] BoxError),
}

impl StopError {
    pub fn resource<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StopError::Resource(Box::new(error))
    }
}

/// Returned by [`Service::register`](crate::Service::register) when its routes cannot be mounted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("route {path} conflicts with already mounted {existing}")]
    RouteConflict { path: String, existing: String },
    #[error("invalid mount path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

/// Errors surfaced by the [`Host`](crate::Host) to the process entry point.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("service '{service}' failed to register routes: {source}")]
    Register {
        service: &'static str,
        source: RegisterError,
    },
    #[error("service '{service}' failed to start: {source}")]
    StartFailed {
        service: &'static str,
        source: StartError,
    },
    #[error("services failed to stop: {}", describe_failures(.failures))]
    StopFailed {
        failures: Vec<(&'static str, StopError)>,
    },
}

fn describe_failures(failures: &[(&'static str, StopError)]) -> String {
    failures
        .iter()
        .map(|(service, error)| format!("{service} ({error})"))
        .collect::<Vec<_>>()
        .join(", ")
}
