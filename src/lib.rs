//! Route Runner - lifecycle coordination for a single HTTP server
//!
//! Route units are registered in order against one server instance, then the
//! server is served until a termination signal arrives or the listener stops.
//! Every component races to end the same [`Lifecycle`]; the first recorded
//! [`StopReason`] wins.

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, LifecycleError, ServeError, ShutdownError};
pub use lifecycle::{
    run_with_routes, Coordinator, Lifecycle, Phase, RouteUnit, StopReason, TerminationSignal,
};
pub use server::{HttpServer, Server};
