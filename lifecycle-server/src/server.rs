use std::future::Future;
use std::sync::Arc;

use axum::Router;
use eyre::{Result, WrapErr};
use lifecycle_common::metrics::serve;
use lifecycle_common::Host;
use tracing::{error, info};

/// Start every service, serve `app` on `bind` until shutdown begins, then stop
/// every service.
///
/// Shutdown begins when `signal` resolves. The listener is armed before any
/// service starts, so a signal during boot cancels the start in flight and the
/// services started so far are rolled back.
pub async fn run<F>(host: Arc<Host>, app: Router, bind: &str, signal: F) -> Result<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let shutdown_token = host.shutdown_token();
    let listener = tokio::spawn(async move {
        if let Err(e) = signal.await {
            error!(error = %e, "failed to listen for shutdown signals");
        }
        shutdown_token.cancel();
    });

    if let Err(e) = host.start_all().await {
        listener.abort();
        if host.shutdown_token().is_cancelled() {
            info!(error = %e, "shutdown requested during startup");
            return Ok(());
        }
        return Err(e).wrap_err("failed to start services");
    }
    info!(services = ?host.service_names(), "all services started");

    info!(bind = %bind, "listening");
    let served = serve(app, bind, host.shutdown_signal()).await;
    if let Err(e) = &served {
        error!(error = %e, "http server exited with an error");
    }
    listener.abort();

    host.stop_all().await.wrap_err("failed to stop services cleanly")?;
    served.wrap_err("failed to serve http")?;

    Ok(())
}
