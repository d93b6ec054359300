//! Bundled route units
//!
//! Each unit registers its endpoints on the [`HttpServer`] during startup.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{routing::get, Router};

use crate::{
    lifecycle::{ApplyRoutes, Lifecycle, RouteUnit},
    server::HttpServer,
};
use handlers::{health_handler, status_handler, StatusState};

/// Registers `GET /health`
#[derive(Debug, Default)]
pub struct HealthRoutes;

impl RouteUnit<HttpServer> for HealthRoutes {
    fn init(self: Box<Self>, _lifecycle: &Lifecycle) -> Box<dyn ApplyRoutes<HttpServer>> {
        Box::new(|_: &Lifecycle, server: &mut HttpServer| -> anyhow::Result<()> {
            server.route("/health", get(health_handler));
            Ok(())
        })
    }
}

/// Registers `GET /status`, reporting on the lifecycle it was initialised with
#[derive(Debug)]
pub struct StatusRoutes {
    address: String,
}

impl StatusRoutes {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl RouteUnit<HttpServer> for StatusRoutes {
    fn init(self: Box<Self>, lifecycle: &Lifecycle) -> Box<dyn ApplyRoutes<HttpServer>> {
        let state = Arc::new(StatusState::new(lifecycle.clone(), self.address));
        Box::new(move |_: &Lifecycle, server: &mut HttpServer| -> anyhow::Result<()> {
            server.merge(status_router(state));
            Ok(())
        })
    }
}

/// Create the status router
pub fn status_router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Units registered by the binary
pub fn default_units(address: &str) -> Vec<Box<dyn RouteUnit<HttpServer>>> {
    vec![Box::new(HealthRoutes), Box::new(StatusRoutes::new(address))]
}
