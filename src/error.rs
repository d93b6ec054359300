//! Error types for configuration, startup, serving and shutdown.
//!
//! Only [`LifecycleError`] is ever returned to the caller of the coordinator.
//! [`ServeError`] and [`ShutdownError`] are observed by the runner and the
//! signal watcher, logged, and folded into lifecycle termination.

use std::time::Duration;
use thiserror::Error;

/// Startup failures that abort the lifecycle before the server listens.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A route unit failed to apply its routes.
    #[error("route registration #{position} failed: {source}")]
    Registration {
        /// Zero-based position of the failing unit.
        position: usize,
        /// Error returned by the unit.
        source: anyhow::Error,
    },

    /// Termination signals could not be subscribed to.
    #[error("failed to subscribe to termination signals: {0}")]
    Signals(#[source] std::io::Error),
}

/// Reasons the listener stopped serving.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServeError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Fatal I/O error while serving.
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serving ended because a graceful shutdown was requested.
    #[error("server closed")]
    Closed,
}

impl ServeError {
    /// True when the listener stopped because shutdown was requested.
    pub fn is_closed(&self) -> bool {
        matches!(self, ServeError::Closed)
    }
}

/// Graceful shutdown did not complete cleanly.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("graceful shutdown exceeded grace period of {grace:?}")]
    DeadlineExceeded { grace: Duration },

    #[error("graceful shutdown failed: {0}")]
    Failed(String),
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid port {value:?}")]
    InvalidPort { value: String },
}
