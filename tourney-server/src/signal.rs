use tokio::sync::watch;

/// Waits for SIGINT or SIGTERM and notifies all receivers of `tx` afterwards.
pub async fn shutdown_on_signal(tx: watch::Sender<()>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            log::error!("Failed to listen for SIGINT: {}", err);
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                log::error!("Failed to listen for SIGTERM: {}", err);

                if let Err(err) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for SIGINT: {}", err);
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for SIGINT: {}", err);
        }
    }

    log::info!("Received shutdown signal");

    let _ = tx.send(());
}
