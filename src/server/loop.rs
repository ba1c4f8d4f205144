// Server loop module
// Accepts connections until shutdown, then waits for in-flight requests to drain

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the accept loop until `shutdown` fires.
///
/// Open connections get up to `performance.write_timeout` seconds to finish
/// after the listener closes.
#[allow(clippy::ignored_unit_patterns)]
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownSignal>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            _ = shutdown.wait() => break,
        }
    }

    drop(listener);
    drain(&active_connections, Duration::from_secs(state.config.performance.write_timeout)).await;
    Ok(())
}

/// Wait for the active connection count to reach zero or the grace period to end
async fn drain(active_connections: &AtomicUsize, grace: Duration) {
    let remaining = active_connections.load(Ordering::SeqCst);
    if remaining == 0 {
        return;
    }
    logger::log_info(&format!("Waiting for {remaining} open connection(s) to finish"));

    let wait = async {
        while active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    };
    if tokio::time::timeout(grace, wait).await.is_err() {
        logger::log_warning(&format!(
            "Shutdown grace period elapsed with {} connection(s) still open",
            active_connections.load(Ordering::SeqCst)
        ));
    }
}
