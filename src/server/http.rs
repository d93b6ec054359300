//! axum-backed HTTP server

use std::{net::SocketAddr, sync::Mutex};
use async_trait::async_trait;
use axum::{routing::MethodRouter, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::Server;
use crate::{
    error::{ServeError, ShutdownError},
    lifecycle::ShutdownContext,
};

/// HTTP listener whose routing table is filled in by route units
#[derive(Debug, Default)]
pub struct HttpServer {
    router: Router,
    /// Cancelled once graceful shutdown is requested
    shutdown: CancellationToken,
    /// Cancelled once `start` has returned
    stopped: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpServer {
    /// Create a server with an empty routing table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the routing table
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.router = std::mem::take(&mut self.router).route(path, method_router);
        self
    }

    /// Merge another router's routes into this server
    pub fn merge(&mut self, other: Router) -> &mut Self {
        self.router = std::mem::take(&mut self.router).merge(other);
        self
    }

    /// Mount `router` under `path`
    pub fn nest(&mut self, path: &str, router: Router) -> &mut Self {
        self.router = std::mem::take(&mut self.router).nest(path, router);
        self
    }

    /// Address actually bound, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    /// Whether `start` has returned
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    async fn serve(&self, addr: &str) -> Result<(), ServeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let bound = listener.local_addr()?;
        if let Ok(mut local_addr) = self.local_addr.lock() {
            *local_addr = Some(bound);
        }
        debug!(address = %bound, "listener bound");

        let app = self.router.clone().layer(TraceLayer::new_for_http());
        axum::serve(listener, app)
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await?;

        if self.shutdown.is_cancelled() {
            Err(ServeError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Server for HttpServer {
    async fn start(&self, addr: &str) -> Result<(), ServeError> {
        let result = self.serve(addr).await;
        self.stopped.cancel();
        result
    }

    async fn shutdown(&self, ctx: &ShutdownContext) -> Result<(), ShutdownError> {
        self.shutdown.cancel();
        tokio::select! {
            biased;
            _ = self.stopped.cancelled() => Ok(()),
            _ = ctx.expired() => Err(ShutdownError::DeadlineExceeded { grace: ctx.grace() }),
        }
    }
}
