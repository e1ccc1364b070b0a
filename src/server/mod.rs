// Server module entry point
// Accept loop, connection handling and the request service

pub mod connection;
pub mod listener;
pub mod service;
pub mod signal;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::AppState;
use crate::logger;

// Re-export commonly used items
pub use listener::create_reusable_listener;
pub use service::handle_request;

/// Poll interval while waiting for open connections to finish
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections until SIGTERM or Ctrl+C, then drain
///
/// Must run inside a `LocalSet`; connections are served with `spawn_local`.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    serve(listener, state, signal::shutdown_signal()).await
}

/// Accept connections until `shutdown` resolves
///
/// The listener is closed first; open connections then get up to
/// `performance.write_timeout` seconds to finish before this returns.
/// Whatever is still open after that is dropped with the `LocalSet`.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    let grace = Duration::from_secs(state.config.performance.write_timeout);
    println!(
        "[SHUTDOWN] Listener closed, waiting up to {}s for {} open connection(s)",
        grace.as_secs(),
        active_connections.load(Ordering::SeqCst)
    );

    if drain(&active_connections, grace).await {
        println!("[SHUTDOWN] All connections finished");
    } else {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, closing them",
            active_connections.load(Ordering::SeqCst),
            grace.as_secs()
        ));
    }
    Ok(())
}

/// Wait for the connection counter to reach zero, `false` on timeout
async fn drain(active_connections: &AtomicUsize, grace: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + grace;
    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::Flow;
    use crate::handler::{Handler, HandlerCore, HandlerRegistry};
    use crate::request::QueryParams;
    use std::io::{Read, Write};
    use std::ops::ControlFlow;

    /// Takes long enough to still be running when shutdown starts
    struct SlowHandler {
        core: HandlerCore,
    }

    impl Handler for SlowHandler {
        fn core(&self) -> &HandlerCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut HandlerCore {
            &mut self.core
        }

        fn process(&mut self, _params: &[String], _query: &QueryParams) -> Flow {
            std::thread::sleep(Duration::from_millis(400));
            ControlFlow::Continue(())
        }
    }

    fn slow_state() -> Arc<AppState> {
        let mut cfg = Config::load_from("does-not-exist/frontdesk").unwrap();
        cfg.database.enabled = false;
        cfg.logging.access_log = false;
        let mut registry = HandlerRegistry::with_builtin("Test site");
        registry.register("Slow", || SlowHandler {
            core: HandlerCore::new(),
        });
        Arc::new(AppState::new(&cfg, registry))
    }

    #[test]
    fn test_shutdown_waits_for_in_flight_request() {
        let state = slow_state();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();

        // Same shape as main: the LocalSet is dropped as soon as serve returns
        let server = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                let shutdown = async {
                    let _ = shutdown_rx.await;
                };
                let local = tokio::task::LocalSet::new();
                local
                    .run_until(serve(listener, state, shutdown))
                    .await
                    .map_err(|e| e.to_string())
            })
        });

        let addr = addr_rx.recv().unwrap();
        let mut client = std::net::TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /slow HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));
        shutdown_tx.send(()).unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert_eq!(server.join().unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        assert!(drain(&AtomicUsize::new(0), Duration::from_millis(10)).await);
        assert!(!drain(&AtomicUsize::new(1), Duration::from_millis(60)).await);
    }
}
