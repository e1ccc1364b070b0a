// Signal handling module
//
// SIGTERM and SIGINT (Ctrl+C) stop the accept loop; `serve` then waits
// for open connections up to `performance.write_timeout`.

/// Resolves once a shutdown signal has been received
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            crate::logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => println!("\n[SIGNAL] SIGTERM received, shutting down"),
        _ = tokio::signal::ctrl_c() => println!("\n[SIGNAL] SIGINT received, shutting down"),
    }
}

/// Resolves once Ctrl+C has been received
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    println!("\n[SIGNAL] Ctrl+C received, shutting down");
}
