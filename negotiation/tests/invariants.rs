//! Property-based tests for the negotiation state machine.
//!
//! Drives the reducer with arbitrary command sequences and checks the
//! invariants that must hold at every observation point, however the
//! commands interleave.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use pedicab_core::reducer::Reducer;
use pedicab_negotiation::{
    Catalog, Counterparty, CounterpartyId, NegotiationAction, NegotiationConfig,
    NegotiationReducer, NegotiationState, Notification, ProductionNegotiationEnvironment,
    Resolution,
};
use pedicab_testing::test_clock;
use proptest::prelude::*;
use std::sync::Arc;

const COUNTDOWN_SECONDS: u32 = 5;

/// The commands a hostile caller (or timer) could throw at the engine.
#[derive(Debug, Clone)]
enum Command {
    Select(u64),
    Cancel,
    Accept,
    Decline,
    /// A tick from the currently armed countdown.
    LiveTick,
    /// A tick from a long-dead arming.
    StaleTick,
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        (0u64..6).prop_map(Command::Select),
        Just(Command::Cancel),
        Just(Command::Accept),
        Just(Command::Decline),
        Just(Command::LiveTick),
        Just(Command::StaleTick),
    ]
}

fn catalog() -> Catalog {
    Catalog::from_entries([
        Counterparty::new(1, "available"),
        Counterparty::new(2, "available"),
        Counterparty::new(3, "unavailable").unavailable(),
    ])
}

proptest! {
    /// For all command sequences: never more than one pending negotiation,
    /// the countdown stays within bounds, rejected commands change nothing,
    /// and every timeout names the counterparty that was selected.
    #[test]
    fn state_machine_invariants_hold(commands in prop::collection::vec(command_strategy(), 0..64)) {
        let reducer: NegotiationReducer<ProductionNegotiationEnvironment> =
            NegotiationReducer::new();
        let env = ProductionNegotiationEnvironment::new(Arc::new(test_clock()));
        let mut state = NegotiationState::new(
            catalog(),
            NegotiationConfig::new().with_countdown_seconds(COUNTDOWN_SECONDS),
        );

        for command in commands {
            let action = match command {
                Command::Select(raw) => NegotiationAction::Select {
                    id: CounterpartyId::new(raw),
                },
                Command::Cancel => NegotiationAction::Cancel,
                Command::Accept => NegotiationAction::Accept,
                Command::Decline => NegotiationAction::Decline,
                Command::LiveTick => NegotiationAction::Tick {
                    generation: state.generation(),
                },
                Command::StaleTick => NegotiationAction::Tick {
                    generation: state.generation().wrapping_sub(1),
                },
            };

            let before = state.clone();
            let selected_before = state.selected();

            match reducer.reduce(&mut state, action, &env) {
                Ok(reduced) => {
                    for notification in &reduced.notifications {
                        if let Notification::Resolved { id, resolution } = notification {
                            // A resolution always names the counterparty
                            // that was pending, and lands back on idle.
                            prop_assert_eq!(Some(*id), selected_before);
                            prop_assert!(!state.is_pending());
                            if *resolution == Resolution::TimedOut {
                                prop_assert_eq!(
                                    state.remaining_seconds(),
                                    COUNTDOWN_SECONDS
                                );
                            }
                        }
                    }
                },
                Err(_) => {
                    // Rejections leave state exactly as it was.
                    prop_assert_eq!(&state, &before);
                },
            }

            // Exactly one of Idle/Pending, with a bounded countdown.
            prop_assert_eq!(state.is_pending(), state.selected().is_some());
            prop_assert!(state.remaining_seconds() <= COUNTDOWN_SECONDS);
            if state.is_pending() {
                prop_assert!(state.remaining_seconds() >= 1);
            }
        }
    }

    /// A selection succeeds iff the engine is idle and the target exists
    /// and is available.
    #[test]
    fn select_succeeds_iff_idle_and_available(raw in 0u64..6, pending_first in any::<bool>()) {
        let reducer: NegotiationReducer<ProductionNegotiationEnvironment> =
            NegotiationReducer::new();
        let env = ProductionNegotiationEnvironment::new(Arc::new(test_clock()));
        let mut state = NegotiationState::new(catalog(), NegotiationConfig::new());

        if pending_first {
            reducer
                .reduce(
                    &mut state,
                    NegotiationAction::Select {
                        id: CounterpartyId::new(1),
                    },
                    &env,
                )
                .unwrap();
        }

        let id = CounterpartyId::new(raw);
        let result = reducer.reduce(&mut state, NegotiationAction::Select { id }, &env);

        let should_succeed = !pending_first
            && state.catalog().get(id).is_some_and(|entry| entry.available);
        prop_assert_eq!(result.is_ok(), should_succeed);
    }
}
