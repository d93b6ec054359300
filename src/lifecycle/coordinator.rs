//! Sequences registration, signal watching and serving around one lifecycle

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    context::{Lifecycle, StopReason},
    registrar::{register_routes, RouteUnit},
    runner::run_server,
    signals::{watch_signals, OsSignals, SignalSource},
};
use crate::{
    config::Config,
    error::LifecycleError,
    server::{HttpServer, Server},
};

/// Owns the server instance for one run.
///
/// Both `run` methods spawn onto the current tokio runtime and must be
/// called from within one.
pub struct Coordinator<S> {
    config: Config,
    server: S,
}

impl<S: Server> Coordinator<S> {
    pub fn new(config: Config, server: S) -> Self {
        Self { config, server }
    }

    /// Register `units`, then serve until a termination signal arrives or
    /// the listener stops.
    ///
    /// Returns as soon as serving has been launched. Await
    /// [`Lifecycle::cancelled`] to know when the server has stopped.
    ///
    /// Cancelling `parent` ends the lifecycle and the signal watcher, but
    /// does not shut the listener down: after a parent cancellation the
    /// lifecycle ending no longer implies the server has stopped serving.
    pub fn run<I>(self, parent: &CancellationToken, units: I) -> Result<Lifecycle, LifecycleError>
    where
        I: IntoIterator<Item = Box<dyn RouteUnit<S>>>,
    {
        self.launch(parent, units, || {
            OsSignals::termination().map_err(LifecycleError::Signals)
        })
    }

    /// Same as [`run`](Self::run) with a caller-supplied signal source.
    pub fn run_with_signals<I, Src>(
        self,
        parent: &CancellationToken,
        units: I,
        signals: Src,
    ) -> Result<Lifecycle, LifecycleError>
    where
        I: IntoIterator<Item = Box<dyn RouteUnit<S>>>,
        Src: SignalSource,
    {
        self.launch(parent, units, move || Ok(signals))
    }

    fn launch<I, Src, F>(
        self,
        parent: &CancellationToken,
        units: I,
        subscribe: F,
    ) -> Result<Lifecycle, LifecycleError>
    where
        I: IntoIterator<Item = Box<dyn RouteUnit<S>>>,
        Src: SignalSource,
        F: FnOnce() -> Result<Src, LifecycleError>,
    {
        let Coordinator { config, mut server } = self;
        let lifecycle = Lifecycle::new(parent);

        register_routes(&lifecycle, &mut server, units)?;

        let signals = match subscribe() {
            Ok(signals) => signals,
            Err(e) => {
                lifecycle.terminate(StopReason::SignalsUnavailable);
                return Err(e);
            }
        };

        // No further mutation: the watcher and the runner only share it.
        let server = Arc::new(server);
        lifecycle.mark_running();

        tokio::spawn(watch_signals(
            lifecycle.clone(),
            Arc::clone(&server),
            signals,
            config.shutdown_grace,
        ));
        tokio::spawn(run_server(lifecycle.clone(), server, config.address()));

        info!(address = %config.address(), "lifecycle running");
        Ok(lifecycle)
    }
}

/// Register `units` on a fresh [`HttpServer`] and serve it.
pub fn run_with_routes<I>(
    parent: &CancellationToken,
    config: Config,
    units: I,
) -> Result<Lifecycle, LifecycleError>
where
    I: IntoIterator<Item = Box<dyn RouteUnit<HttpServer>>>,
{
    Coordinator::new(config, HttpServer::new()).run(parent, units)
}
