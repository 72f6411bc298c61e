//! Integration tests for the negotiation engine with a live countdown.
//!
//! These run the full stack (engine, store, timer tasks) under tokio's
//! paused clock, so the 30-second scenarios complete instantly and
//! deterministically.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use pedicab_negotiation::{
    Catalog, Counterparty, CounterpartyId, NegotiationConfig, NegotiationEngine, Notification,
    ProductionNegotiationEnvironment, Rejection, Resolution,
};
use pedicab_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Test Fixtures
// ============================================================================

fn test_env() -> ProductionNegotiationEnvironment {
    ProductionNegotiationEnvironment::new(Arc::new(test_clock()))
}

fn catalog() -> Catalog {
    Catalog::from_entries([
        Counterparty::new(1, "Maria Santos (4.9, ETA 3 min)"),
        Counterparty::new(2, "Ana Garcia (4.7, ETA 5 min)"),
        Counterparty::new(3, "Isabella Martinez (4.6, ETA 4 min)").unavailable(),
    ])
}

fn engine(config: NegotiationConfig) -> NegotiationEngine<ProductionNegotiationEnvironment> {
    NegotiationEngine::new(catalog(), config, test_env())
}

fn id(raw: u64) -> CounterpartyId {
    CounterpartyId::new(raw)
}

/// Bound a receive so a hung test fails instead of spinning the paused
/// clock forever.
async fn recv(
    rx: &mut tokio::sync::broadcast::Receiver<Notification>,
) -> Notification {
    timeout(Duration::from_secs(120), rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("notification channel closed unexpectedly")
}

// ============================================================================
// Scenario A: full countdown to timeout
// ============================================================================

#[tokio::test(start_paused = true)]
async fn full_countdown_times_out_exactly_once() {
    let engine = engine(NegotiationConfig::new());
    let mut rx = engine.subscribe();

    assert_ok!(engine.select(id(1)).await);
    assert!(engine.is_pending().await);
    assert_eq!(engine.remaining_seconds().await, 30);

    assert_eq!(
        recv(&mut rx).await,
        Notification::Selected {
            id: id(1),
            remaining_seconds: 30,
        }
    );

    // 29 ticks count down from 29 to 1; the zero tick is the timeout.
    for expected in (1..=29).rev() {
        assert_eq!(
            recv(&mut rx).await,
            Notification::Tick {
                id: id(1),
                remaining_seconds: expected,
            }
        );
    }
    assert_eq!(
        recv(&mut rx).await,
        Notification::Resolved {
            id: id(1),
            resolution: Resolution::TimedOut,
        }
    );

    // Terminal-then-reset: the engine is already idle with a full countdown.
    assert!(!engine.is_pending().await);
    assert_eq!(engine.selected().await, None);
    assert_eq!(engine.remaining_seconds().await, 30);

    // Exactly one timeout: nothing else ever arrives.
    let silence = timeout(Duration::from_secs(120), rx.recv()).await;
    assert_err!(silence);
}

// ============================================================================
// Scenario B: cancellation mid-countdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn cancel_mid_countdown_never_times_out() {
    let engine = engine(NegotiationConfig::new());
    let mut rx = engine.subscribe();

    assert_ok!(engine.select(id(1)).await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Selected {
            id: id(1),
            remaining_seconds: 30,
        }
    );

    // Let five seconds elapse.
    for expected in (25..=29).rev() {
        assert_eq!(
            recv(&mut rx).await,
            Notification::Tick {
                id: id(1),
                remaining_seconds: expected,
            }
        );
    }
    assert_eq!(engine.remaining_seconds().await, 25);

    assert_ok!(engine.cancel().await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Resolved {
            id: id(1),
            resolution: Resolution::Cancelled,
        }
    );

    assert!(!engine.is_pending().await);
    assert_eq!(engine.remaining_seconds().await, 30);

    // No further tick and in particular no timeout, ever.
    let silence = timeout(Duration::from_secs(120), rx.recv()).await;
    assert_err!(silence);
}

#[tokio::test(start_paused = true)]
async fn second_cancel_is_rejected() {
    let engine = engine(NegotiationConfig::new());

    assert_ok!(engine.select(id(1)).await);
    assert_ok!(engine.cancel().await);
    assert_eq!(engine.cancel().await, Err(Rejection::NothingToCancel));
}

// ============================================================================
// Rejection scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn select_unavailable_counterparty_rejected() {
    let engine = engine(NegotiationConfig::new());

    assert_eq!(engine.select(id(3)).await, Err(Rejection::NotAvailable));
    assert!(!engine.is_pending().await);
}

#[tokio::test(start_paused = true)]
async fn select_while_pending_leaves_countdown_undisturbed() {
    let engine = engine(NegotiationConfig::new());
    let mut rx = engine.subscribe();

    assert_ok!(engine.select(id(1)).await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Selected {
            id: id(1),
            remaining_seconds: 30,
        }
    );
    assert_eq!(
        recv(&mut rx).await,
        Notification::Tick {
            id: id(1),
            remaining_seconds: 29,
        }
    );

    assert_eq!(engine.select(id(1)).await, Err(Rejection::AlreadyPending));
    assert_eq!(engine.select(id(2)).await, Err(Rejection::AlreadyPending));

    // The original countdown continues from where it was.
    assert_eq!(
        recv(&mut rx).await,
        Notification::Tick {
            id: id(1),
            remaining_seconds: 28,
        }
    );
}

// ============================================================================
// Accept / decline
// ============================================================================

#[tokio::test(start_paused = true)]
async fn accept_resolves_and_stops_the_countdown() {
    let engine = engine(NegotiationConfig::new());
    let mut rx = engine.subscribe();

    assert_ok!(engine.select(id(2)).await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Selected {
            id: id(2),
            remaining_seconds: 30,
        }
    );

    assert_ok!(engine.accept().await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Resolved {
            id: id(2),
            resolution: Resolution::Accepted,
        }
    );
    assert!(!engine.is_pending().await);

    let silence = timeout(Duration::from_secs(120), rx.recv()).await;
    assert_err!(silence);
}

// ============================================================================
// State observation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn watch_state_tracks_every_tick() {
    let engine = engine(NegotiationConfig::new().with_countdown_seconds(3));
    let mut rx = engine.subscribe();
    let watch = engine.watch_state();

    assert_ok!(engine.select(id(1)).await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Selected {
            id: id(1),
            remaining_seconds: 3,
        }
    );
    assert_eq!(watch.borrow().remaining_seconds(), 3);

    assert_eq!(
        recv(&mut rx).await,
        Notification::Tick {
            id: id(1),
            remaining_seconds: 2,
        }
    );
    // The snapshot an observer woken by that tick sees is already updated.
    assert_eq!(watch.borrow().remaining_seconds(), 2);
    assert_eq!(watch.borrow().selected(), Some(id(1)));
}

/// Two engines over the two directions of the marketplace share the
/// lifecycle but not their state.
#[tokio::test(start_paused = true)]
async fn driver_and_passenger_engines_are_independent() {
    let driver_side = engine(NegotiationConfig::new());
    let passenger_side = NegotiationEngine::new(
        Catalog::from_entries([
            Counterparty::new(1, "Juan Dela Cruz (4.8, Pedicab #123)"),
            Counterparty::new(2, "Pedro Santos (4.6, Pedicab #456)"),
        ]),
        NegotiationConfig::new(),
        test_env(),
    );

    assert_ok!(driver_side.select(id(1)).await);
    assert!(!passenger_side.is_pending().await);

    assert_ok!(passenger_side.select(id(2)).await);
    assert_ok!(driver_side.cancel().await);
    assert!(passenger_side.is_pending().await);
    assert_eq!(passenger_side.selected().await, Some(id(2)));
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn dropping_the_engine_mid_countdown_stops_the_timer() {
    let engine = engine(NegotiationConfig::new());
    let mut rx = engine.subscribe();

    assert_ok!(engine.select(id(1)).await);
    assert_eq!(
        recv(&mut rx).await,
        Notification::Selected {
            id: id(1),
            remaining_seconds: 30,
        }
    );

    drop(engine);
    tokio::time::advance(Duration::from_secs(5)).await;

    // The channel closes without delivering another tick.
    let closed = rx.recv().await;
    assert_err!(closed);
}
