//! Termination signal handling for graceful shutdown

use std::{
    collections::HashMap,
    fmt, io,
    os::raw::c_int,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, OnceLock,
    },
    time::Duration,
};
use async_trait::async_trait;
use futures::stream::StreamExt;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM, SIGUSR2};
use signal_hook_tokio::{Handle, Signals};
use tokio::time::timeout_at;
use tracing::{debug, info, warn};

use super::context::{Lifecycle, StopReason};
use crate::{error::ShutdownError, server::Server};

/// Signals that trigger a graceful shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    Interrupt,
    Hangup,
    Terminate,
    User2,
}

impl TerminationSignal {
    /// Every signal the watcher subscribes to
    pub const ALL: [TerminationSignal; 4] = [
        TerminationSignal::Interrupt,
        TerminationSignal::Hangup,
        TerminationSignal::Terminate,
        TerminationSignal::User2,
    ];

    /// Raw signal number
    pub fn as_raw(self) -> c_int {
        match self {
            TerminationSignal::Interrupt => SIGINT,
            TerminationSignal::Hangup => SIGHUP,
            TerminationSignal::Terminate => SIGTERM,
            TerminationSignal::User2 => SIGUSR2,
        }
    }

    /// Map a raw signal number back, if it is watched
    pub fn from_raw(raw: c_int) -> Option<Self> {
        Self::ALL.into_iter().find(|signal| signal.as_raw() == raw)
    }

    /// Conventional signal name, e.g. `SIGINT`
    pub fn name(self) -> &'static str {
        match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::User2 => "SIGUSR2",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of termination signals observed by [`watch_signals`].
#[async_trait]
pub trait SignalSource: Send + 'static {
    /// Wait for the next signal. `None` means no more signals will arrive.
    async fn next_signal(&mut self) -> Option<TerminationSignal>;

    /// Stop intercepting: later deliveries get the OS default action.
    fn release(&mut self);
}

/// Switch gating the conditional default action installed for `raw`.
///
/// signal-hook keeps its process handler for good once a signal has been
/// hooked, so the action is installed once per signal and every
/// [`OsSignals`] arms and disarms the same switch.
fn default_switch(raw: c_int) -> io::Result<Arc<AtomicBool>> {
    static SWITCHES: OnceLock<Mutex<HashMap<c_int, Arc<AtomicBool>>>> = OnceLock::new();

    let mut switches = SWITCHES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(switch) = switches.get(&raw) {
        return Ok(Arc::clone(switch));
    }

    let switch = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register_conditional_default(raw, Arc::clone(&switch))?;
    switches.insert(raw, Arc::clone(&switch));
    Ok(switch)
}

/// Process signals delivered through `signal-hook-tokio`.
///
/// Every watched signal also carries a conditional default action. A new
/// subscription disarms it; after [`release`](SignalSource::release) the next
/// delivery of any watched signal behaves as if no handler had ever been
/// installed (so a second Ctrl-C kills the process). Dropping the source
/// arms it as well, so signals are not swallowed once nobody listens.
///
/// Subscriptions are expected to follow one another; two live `OsSignals`
/// watching the same signal share its switch.
pub struct OsSignals {
    signals: Signals,
    handle: Handle,
    switches: Vec<Arc<AtomicBool>>,
}

impl OsSignals {
    /// Subscribe to `watched`, intercepting them until released
    pub fn new(watched: &[TerminationSignal]) -> io::Result<Self> {
        // Installed ahead of the stream so it runs first once armed.
        let switches = watched
            .iter()
            .map(|signal| default_switch(signal.as_raw()))
            .collect::<io::Result<Vec<_>>>()?;
        for switch in &switches {
            switch.store(false, Ordering::SeqCst);
        }

        let signals = Signals::new(watched.iter().map(|signal| signal.as_raw()))?;
        let handle = signals.handle();
        Ok(Self {
            signals,
            handle,
            switches,
        })
    }

    /// Subscribe to interrupt, hangup, terminate and SIGUSR2
    pub fn termination() -> io::Result<Self> {
        Self::new(&TerminationSignal::ALL)
    }

    /// Whether the next delivery gets the OS default action
    pub fn is_released(&self) -> bool {
        self.switches
            .iter()
            .all(|switch| switch.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl SignalSource for OsSignals {
    async fn next_signal(&mut self) -> Option<TerminationSignal> {
        while let Some(raw) = self.signals.next().await {
            match TerminationSignal::from_raw(raw) {
                Some(signal) => return Some(signal),
                None => debug!(signal = raw, "ignoring unexpected signal"),
            }
        }
        None
    }

    fn release(&mut self) {
        for switch in &self.switches {
            switch.store(true, Ordering::SeqCst);
        }
    }
}

impl Drop for OsSignals {
    fn drop(&mut self) {
        self.release();
        self.handle.close();
    }
}

/// Wait for a termination signal, then shut `server` down within `grace`.
///
/// Returns without touching the server if the lifecycle ends first. After a
/// signal the lifecycle is terminated whatever the shutdown outcome.
pub async fn watch_signals<S, Src>(
    lifecycle: Lifecycle,
    server: Arc<S>,
    mut signals: Src,
    grace: Duration,
) where
    S: Server + ?Sized,
    Src: SignalSource,
{
    let signal = tokio::select! {
        biased;
        _ = lifecycle.cancelled() => {
            debug!("lifecycle ended, signal watcher exiting");
            return;
        }
        signal = signals.next_signal() => signal,
    };

    let Some(signal) = signal else {
        warn!("termination signals are no longer observable");
        lifecycle.cancelled().await;
        return;
    };

    lifecycle.record(StopReason::Signal(signal));
    let _guard = lifecycle.guard(StopReason::Signal(signal));
    signals.release();
    info!(%signal, "Got signal, terminating...");

    let ctx = lifecycle.shutdown_context(grace);
    let outcome = match timeout_at(ctx.deadline(), server.shutdown(&ctx)).await {
        Ok(result) => result,
        Err(_) => Err(ShutdownError::DeadlineExceeded { grace }),
    };
    drop(ctx);

    match outcome {
        Ok(()) => info!("HTTP server shut down gracefully"),
        Err(e) => warn!(error = %e, "HTTP server shutdown cause"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_round_trip_for_watched_signals() {
        for signal in TerminationSignal::ALL {
            assert_eq!(TerminationSignal::from_raw(signal.as_raw()), Some(signal));
        }
        assert_eq!(TerminationSignal::from_raw(signal_hook::consts::SIGUSR1), None);
    }

    #[test]
    fn displays_conventional_names() {
        assert_eq!(TerminationSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(TerminationSignal::User2.to_string(), "SIGUSR2");
    }
}
