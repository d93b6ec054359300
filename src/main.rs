//! Route Runner - serves the bundled routes until a termination signal arrives

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use route_runner::{api::default_units, run_with_routes, Config, StopReason};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_runner=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting route-runner v{}: host={}, port={}, grace={:?}",
        env!("CARGO_PKG_VERSION"),
        config.host,
        config.port,
        config.shutdown_grace
    );

    let address = config.address();
    let root = CancellationToken::new();
    let lifecycle = run_with_routes(&root, config, default_units(&address))?;

    lifecycle.cancelled().await;

    match lifecycle.reason() {
        Some(StopReason::ServerFailed(cause)) => {
            error!("Server stopped unexpectedly: {}", cause);
            anyhow::bail!("server failed: {cause}");
        }
        Some(reason) => info!("Server shutdown complete ({})", reason),
        None => info!("Server shutdown complete"),
    }
    Ok(())
}
