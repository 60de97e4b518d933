//! Run the database and worker services behind one HTTP server until SIGINT or SIGTERM.
use std::sync::Arc;

use eyre::{Result, WrapErr};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lifecycle_common::metrics::setup_metrics_recorder;
use lifecycle_common::signals::wait_for_shutdown_signal;
use lifecycle_common::{Binding, ConfigError, Host};
use lifecycle_database::{DatabaseConfig, DatabaseService};
use lifecycle_server::config::ServerConfig;
use lifecycle_server::{handlers, server};
use lifecycle_worker::{WorkerConfig, WorkerService};

fn setup_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

struct Configs {
    server: ServerConfig,
    database: DatabaseConfig,
    worker: WorkerConfig,
}

fn load_configs() -> Result<Configs, ConfigError> {
    Ok(Configs {
        server: ServerConfig::load()?,
        database: DatabaseConfig::load()?,
        worker: WorkerConfig::load()?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let configs = match load_configs() {
        Ok(configs) => configs,
        Err(e) => {
            error!(field = %e.field, "failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let host = Arc::new(
        Host::new("lifecycle-server")
            .with_service(Arc::new(DatabaseService::new(configs.database)))
            .with_service(Arc::new(WorkerService::new(configs.worker)))
            .with_shutdown_timeout(configs.server.shutdown_timeout.0),
    );

    let recorder_handle = setup_metrics_recorder().wrap_err("failed to install metrics recorder")?;
    let app = handlers::app(host.clone(), Some(recorder_handle))?;

    server::run(
        host,
        app,
        &configs.server.bind(),
        wait_for_shutdown_signal(),
    )
    .await
}
