//! Lifecycle coordination
//!
//! ```text
//! Initializing: derive lifecycle from parent -> register route units in order
//!               (first failure terminates and aborts)
//! Running:      signal watcher  | server runner
//!               signal -> shutdown(grace) -> terminate
//!                               | start() returns -> terminate
//! Terminated:   lifecycle cancelled; first recorded reason wins
//! ```

pub mod context;
pub mod coordinator;
pub mod registrar;
pub mod runner;
pub mod signals;

pub use context::{Lifecycle, LifecycleGuard, Phase, ShutdownContext, StopReason};
pub use coordinator::{run_with_routes, Coordinator};
pub use registrar::{register_routes, ApplyRoutes, RouteUnit};
pub use runner::run_server;
pub use signals::{watch_signals, OsSignals, SignalSource, TerminationSignal};
