//! Shared fakes for lifecycle integration tests.

#![allow(dead_code)]

use std::{
    future::Future,
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use route_runner::{
    lifecycle::{ShutdownContext, SignalSource},
    Lifecycle, RouteUnit, ServeError, Server, ShutdownError, TerminationSignal,
};

/// What the fake server saw during a run.
#[derive(Debug, Default)]
pub struct Probe {
    pub inits: Mutex<Vec<String>>,
    pub routes: Mutex<Vec<String>>,
    pub started: AtomicBool,
    pub shutdown_calls: AtomicUsize,
    pub shutdown_remaining: Mutex<Option<Duration>>,
    /// Whether the signal source had been released when shutdown began.
    pub released_at_shutdown: Mutex<Option<bool>>,
    stop: CancellationToken,
}

impl Probe {
    pub fn inits(&self) -> Vec<String> {
        self.inits.lock().unwrap().clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    pub fn released_at_shutdown(&self) -> Option<bool> {
        *self.released_at_shutdown.lock().unwrap()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StartBehavior {
    /// Serve until shutdown is requested, then report `Closed`.
    ServeUntilShutdown,
    /// Fail immediately as if the port were taken.
    AddrInUse,
}

#[derive(Debug, Clone, Copy)]
pub enum ShutdownBehavior {
    Graceful,
    /// Never complete, forcing the grace period to run out.
    Hang,
}

pub struct FakeServer {
    pub probe: Arc<Probe>,
    start: StartBehavior,
    shutdown: ShutdownBehavior,
    release_flag: Option<Arc<AtomicBool>>,
}

impl FakeServer {
    pub fn new(start: StartBehavior, shutdown: ShutdownBehavior) -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            start,
            shutdown,
            release_flag: None,
        }
    }

    /// Note at shutdown time whether `signals` had been released.
    pub fn watching(mut self, signals: &SignalHandle) -> Self {
        self.release_flag = Some(Arc::clone(&signals.released));
        self
    }

    pub fn serving() -> Self {
        Self::new(StartBehavior::ServeUntilShutdown, ShutdownBehavior::Graceful)
    }

    pub fn register(&mut self, route: &str) {
        self.probe.routes.lock().unwrap().push(route.to_string());
    }
}

#[async_trait]
impl Server for FakeServer {
    async fn start(&self, addr: &str) -> Result<(), ServeError> {
        self.probe.started.store(true, Ordering::SeqCst);
        match self.start {
            StartBehavior::AddrInUse => Err(ServeError::Bind {
                addr: addr.to_string(),
                source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
            }),
            StartBehavior::ServeUntilShutdown => {
                self.probe.stop.cancelled().await;
                Err(ServeError::Closed)
            }
        }
    }

    async fn shutdown(&self, ctx: &ShutdownContext) -> Result<(), ShutdownError> {
        self.probe.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        *self.probe.shutdown_remaining.lock().unwrap() = Some(ctx.remaining());
        if let Some(flag) = &self.release_flag {
            *self.probe.released_at_shutdown.lock().unwrap() = Some(flag.load(Ordering::SeqCst));
        }
        match self.shutdown {
            ShutdownBehavior::Graceful => {
                self.probe.stop.cancel();
                Ok(())
            }
            ShutdownBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// Unit that records its init and registers `route`.
pub fn route(probe: &Arc<Probe>, route: &'static str) -> Box<dyn RouteUnit<FakeServer>> {
    let probe = Arc::clone(probe);
    Box::new(move |_: &Lifecycle| {
        probe.inits.lock().unwrap().push(route.to_string());
        move |_: &Lifecycle, server: &mut FakeServer| -> anyhow::Result<()> {
            server.register(route);
            Ok(())
        }
    })
}

/// Unit whose applier fails with `message`.
pub fn failing(probe: &Arc<Probe>, message: &'static str) -> Box<dyn RouteUnit<FakeServer>> {
    let probe = Arc::clone(probe);
    Box::new(move |_: &Lifecycle| {
        probe.inits.lock().unwrap().push(message.to_string());
        move |_: &Lifecycle, _: &mut FakeServer| -> anyhow::Result<()> {
            Err(anyhow::anyhow!(message))
        }
    })
}

/// Channel-driven stand-in for process signals.
pub struct FakeSignals {
    rx: mpsc::UnboundedReceiver<TerminationSignal>,
    released: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct SignalHandle {
    pub tx: mpsc::UnboundedSender<TerminationSignal>,
    released: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl SignalHandle {
    pub fn send(&self, signal: TerminationSignal) {
        self.tx.send(signal).unwrap();
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// True once the watcher has let go of its source.
    pub fn watcher_exited(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

pub fn fake_signals() -> (SignalHandle, FakeSignals) {
    let (tx, rx) = mpsc::unbounded_channel();
    let released = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicBool::new(false));
    (
        SignalHandle {
            tx,
            released: Arc::clone(&released),
            dropped: Arc::clone(&dropped),
        },
        FakeSignals {
            rx,
            released,
            dropped,
        },
    )
}

#[async_trait]
impl SignalSource for FakeSignals {
    async fn next_signal(&mut self) -> Option<TerminationSignal> {
        self.rx.recv().await
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl Drop for FakeSignals {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Await `future` or panic after `timeout`.
pub async fn within<F: Future>(timeout: Duration, future: F) -> F::Output {
    tokio::time::timeout(timeout, future)
        .await
        .expect("timed out waiting for lifecycle")
}
