//! Runs the listener until it stops

use std::sync::Arc;
use tracing::{error, info};

use super::context::{Lifecycle, StopReason};
use crate::server::Server;

/// Serve on `addr` until the listener stops, then terminate the lifecycle.
///
/// Termination happens on every exit, so an unsolicited server failure is
/// still observable by everyone waiting on the lifecycle.
pub async fn run_server<S>(lifecycle: Lifecycle, server: Arc<S>, addr: String)
where
    S: Server + ?Sized,
{
    let mut guard = lifecycle.guard(StopReason::ServerStopped);

    info!(address = %addr, "Server listening");
    match server.start(&addr).await {
        Ok(()) => info!("HTTP server stopped"),
        Err(e) if e.is_closed() => info!(cause = %e, "HTTP server termination cause"),
        Err(e) => {
            error!(error = %e, "HTTP server termination cause");
            guard.set_reason(StopReason::ServerFailed(e.to_string()));
        }
    }
}
