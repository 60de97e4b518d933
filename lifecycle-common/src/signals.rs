use tokio::signal::unix::SignalKind;

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("received SIGINT");
        }
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
    }
    Ok(())
}
