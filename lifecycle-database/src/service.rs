use std::sync::Arc;

use async_trait::async_trait;
use lifecycle_common::{
    Counters, LifecycleContext, RegisterError, RouteRegistrar, Service, ServiceHealth, StartError,
    StopError,
};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::connection::MockConnection;
use crate::error::DatabaseError;
use crate::handlers;

pub const BASE_PATH: &str = "/api/database";

/// State shared between the lifecycle hooks and the request handlers.
pub struct DatabaseState {
    pub config: DatabaseConfig,
    connection: RwLock<Option<Arc<MockConnection>>>,
    pub counters: Counters,
}

impl DatabaseState {
    /// The live connection, or `NotConnected` before start, after a failed start
    /// and once stop has begun.
    pub async fn connection(&self) -> Result<Arc<MockConnection>, DatabaseError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(DatabaseError::NotConnected)
    }

    /// Bump a named counter; a no-op when metrics are disabled.
    pub async fn record(&self, counter: &'static str) {
        if !*self.config.enable_metrics {
            return;
        }
        self.counters.increment(counter).await;
        metrics::counter!("database_operations_total", "operation" => counter).increment(1);
    }
}

/// A service owning one database connection for the life of the process.
pub struct DatabaseService {
    state: Arc<DatabaseState>,
}

impl DatabaseService {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            state: Arc::new(DatabaseState {
                config,
                connection: RwLock::new(None),
                counters: Counters::new(),
            }),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.state.config
    }

    pub async fn is_connected(&self) -> bool {
        self.state.connection().await.is_ok()
    }

    pub async fn connection(&self) -> Option<Arc<MockConnection>> {
        self.state.connection().await.ok()
    }

    pub fn counters(&self) -> &Counters {
        &self.state.counters
    }
}

#[async_trait]
impl Service for DatabaseService {
    fn name(&self) -> &'static str {
        "database"
    }

    fn register(&self, routes: &mut dyn RouteRegistrar) -> Result<(), RegisterError> {
        routes.mount(BASE_PATH, handlers::router(self.state.clone()))
    }

    async fn start(&self, ctx: &LifecycleContext) -> Result<(), StartError> {
        let config = &self.state.config;
        info!(
            url = %config.database_url,
            max_connections = config.max_connections,
            timeout = %config.connect_timeout,
            "connecting to database"
        );

        if self.is_connected().await {
            return Err(StartError::AlreadyStarted);
        }

        let connection = MockConnection::connect(
            &config.database_url,
            config.max_connections,
            config.connect_timeout.0,
            ctx,
        )
        .await
        .map_err(|e| {
            error!(error = %e, "failed to connect to database");
            StartError::resource(e)
        })?;

        if let Err(e) = connection.ping().await {
            error!(error = %e, "database ping failed");
            return Err(StartError::resource(e));
        }

        let mut slot = self.state.connection.write().await;
        if slot.is_some() {
            drop(slot);
            if let Err(e) = connection.close().await {
                warn!(error = %e, "failed to close duplicate database connection");
            }
            return Err(StartError::AlreadyStarted);
        }
        *slot = Some(Arc::new(connection));

        info!("database connection established successfully");
        Ok(())
    }

    async fn stop(&self, ctx: &LifecycleContext) -> Result<(), StopError> {
        info!("shutting down database service");

        let started = Instant::now();
        let released = ctx
            .run(async {
                // Handlers stop seeing the connection before it is closed.
                let connection = self.state.connection.write().await.take();
                match connection {
                    Some(connection) => connection.close().await.map(|()| true),
                    None => Ok(false),
                }
            })
            .await;

        match released {
            Ok(Ok(true)) => {
                info!("database service shutdown complete");
                Ok(())
            }
            Ok(Ok(false)) => {
                info!("database was not connected");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "error closing database connection");
                Err(StopError::resource(e))
            }
            Err(e) => {
                warn!(error = %e, "database shutdown timed out");
                Err(StopError::Timeout {
                    waited: started.elapsed(),
                })
            }
        }
    }

    async fn health(&self) -> ServiceHealth {
        let ping = match self.state.connection().await {
            Ok(connection) => connection.ping().await,
            Err(e) => Err(e),
        };
        match ping {
            Ok(()) => ServiceHealth::Healthy,
            Err(e) => ServiceHealth::unhealthy(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use lifecycle_common::Binding;

    use super::*;

    #[tokio::test]
    async fn stop_gives_up_at_the_deadline() {
        let service = DatabaseService::new(DatabaseConfig::load_from(&HashMap::new()).unwrap());
        service.start(&LifecycleContext::new()).await.unwrap();

        // Keeps stop from taking the connection slot.
        let reader = service.state.connection.read().await;
        let result = service
            .stop(&LifecycleContext::new().with_timeout(Duration::from_millis(50)))
            .await;
        drop(reader);

        assert!(matches!(result, Err(StopError::Timeout { .. })));
        assert!(service.is_connected().await);

        service.stop(&LifecycleContext::new()).await.unwrap();
        assert!(!service.is_connected().await);
    }
}
