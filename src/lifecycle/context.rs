//! The shared lifecycle context and the bounded shutdown scope derived from it

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::Duration,
};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::signals::TerminationSignal;

/// Why the lifecycle ended. Only the first termination is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A route unit failed during startup.
    RegistrationFailed,
    /// Termination signals could not be subscribed to during startup.
    SignalsUnavailable,
    /// Shutdown was driven by a termination signal.
    Signal(TerminationSignal),
    /// The listener stopped without reporting an unexpected error.
    ServerStopped,
    /// The listener stopped with an unexpected error.
    ServerFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::RegistrationFailed => f.write_str("route registration failed"),
            StopReason::SignalsUnavailable => f.write_str("termination signals unavailable"),
            StopReason::Signal(signal) => write!(f, "received {signal}"),
            StopReason::ServerStopped => f.write_str("server stopped"),
            StopReason::ServerFailed(cause) => write!(f, "server failed: {cause}"),
        }
    }
}

/// Coordinator state machine. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    Terminated,
}

#[derive(Debug, Default)]
struct Shared {
    reason: OnceLock<StopReason>,
    running: AtomicBool,
}

/// Cancellable scope representing "the server is supposed to be running".
///
/// Clones share the same state. Cancellation is idempotent and irreversible.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    token: CancellationToken,
    shared: Arc<Shared>,
}

impl Lifecycle {
    /// Derive a new lifecycle from the caller's token.
    ///
    /// Cancelling `parent` cancels the lifecycle, never the other way round.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// End the lifecycle, recording `reason` if nobody ended it before.
    pub fn terminate(&self, reason: StopReason) {
        self.record(reason);
        self.token.cancel();
    }

    /// Record why the lifecycle is about to end without ending it yet.
    ///
    /// Returns `false` if a reason was already recorded or the lifecycle has
    /// already ended.
    pub fn record(&self, reason: StopReason) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let shown = reason.to_string();
        let recorded = self.shared.reason.set(reason).is_ok();
        if recorded {
            debug!(reason = %shown, "lifecycle stop reason recorded");
        }
        recorded
    }

    /// End the lifecycle without recording a reason.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the lifecycle has ended
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the lifecycle has ended.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The first recorded stop reason, if any.
    ///
    /// `None` after termination means the parent token was cancelled.
    pub fn reason(&self) -> Option<&StopReason> {
        self.shared.reason.get()
    }

    /// Current coordinator phase
    pub fn phase(&self) -> Phase {
        if self.token.is_cancelled() {
            Phase::Terminated
        } else if self.shared.running.load(Ordering::Acquire) {
            Phase::Running
        } else {
            Phase::Initializing
        }
    }

    /// Underlying token, for use with APIs that take one directly
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn mark_running(&self) {
        self.shared.running.store(true, Ordering::Release);
    }

    /// Returns a guard that terminates the lifecycle when dropped.
    pub fn guard(&self, reason: StopReason) -> LifecycleGuard {
        LifecycleGuard {
            lifecycle: self.clone(),
            reason: Some(reason),
        }
    }

    /// Derive a scope bounded by `grace` for a graceful shutdown.
    pub fn shutdown_context(&self, grace: Duration) -> ShutdownContext {
        ShutdownContext {
            token: self.token.child_token(),
            deadline: Instant::now() + grace,
            grace,
        }
    }
}

/// Terminates the lifecycle on drop, on every exit path of its owner.
#[derive(Debug)]
pub struct LifecycleGuard {
    lifecycle: Lifecycle,
    reason: Option<StopReason>,
}

impl LifecycleGuard {
    /// Replace the reason recorded when the guard fires.
    pub fn set_reason(&mut self, reason: StopReason) {
        self.reason = Some(reason);
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        match self.reason.take() {
            Some(reason) => self.lifecycle.terminate(reason),
            None => self.lifecycle.cancel(),
        }
    }
}

/// Timeout scope passed to [`Server::shutdown`](crate::server::Server::shutdown).
///
/// Dropping the context releases its child token.
#[derive(Debug)]
pub struct ShutdownContext {
    token: CancellationToken,
    deadline: Instant,
    grace: Duration,
}

impl ShutdownContext {
    /// Instant at which the shutdown is abandoned
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Grace period this context was derived with
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Time left before the shutdown is abandoned.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Completes when the deadline passes or the lifecycle ends.
    pub async fn expired(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = sleep_until(self.deadline) => {}
        }
    }

    /// Non-blocking check of [`expired`](Self::expired)
    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }
}

impl Drop for ShutdownContext {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
