//! Real signal delivery through `OsSignals`.
//!
//! Signals are process-wide, so everything runs in one test of its own binary.

mod common;

use std::{sync::Arc, time::Duration};
use signal_hook::{consts::SIGUSR2, low_level::raise};
use tokio_util::sync::CancellationToken;

use common::{route, within, FakeServer};
use route_runner::{
    lifecycle::{OsSignals, SignalSource},
    Config, Coordinator, StopReason, TerminationSignal,
};

#[tokio::test]
async fn raised_signals_reach_each_subscription_in_turn() {
    // A fresh subscription must intercept again after an earlier one was
    // released and dropped.
    for _ in 0..2 {
        let mut signals = OsSignals::new(&[TerminationSignal::User2]).unwrap();
        assert!(!signals.is_released());

        raise(SIGUSR2).unwrap();
        let received = within(Duration::from_secs(2), signals.next_signal()).await;
        assert_eq!(received, Some(TerminationSignal::User2));

        signals.release();
        assert!(signals.is_released());
    }

    let server = FakeServer::serving();
    let probe = Arc::clone(&server.probe);
    let config = Config {
        host: "127.0.0.1".into(),
        port: 0,
        shutdown_grace: Duration::from_secs(5),
    };
    let lifecycle = Coordinator::new(config, server)
        .run(&CancellationToken::new(), vec![route(&probe, "/a")])
        .unwrap();

    raise(SIGUSR2).unwrap();
    within(Duration::from_secs(5), lifecycle.cancelled()).await;

    assert_eq!(probe.shutdown_calls(), 1);
    assert_eq!(
        lifecycle.reason(),
        Some(&StopReason::Signal(TerminationSignal::User2))
    );
}
