//! Server instance interface consumed by the coordinator
//!
//! The coordinator only needs to start a server and to ask it to stop.
//! [`HttpServer`] is the axum-backed implementation used by the binary.

pub mod http;

use async_trait::async_trait;

use crate::{
    error::{ServeError, ShutdownError},
    lifecycle::ShutdownContext,
};

pub use http::HttpServer;

#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Bind `addr` and serve until stopped. Blocks for the listener's lifetime.
    async fn start(&self, addr: &str) -> Result<(), ServeError>;

    /// Stop serving gracefully, giving up once `ctx` expires.
    async fn shutdown(&self, ctx: &ShutdownContext) -> Result<(), ShutdownError>;
}
