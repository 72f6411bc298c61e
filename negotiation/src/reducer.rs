//! Reducer for the negotiation lifecycle.

use crate::actions::{NegotiationAction, Rejection};
use crate::environment::NegotiationEnvironment;
use crate::types::{NegotiationState, Notification, Phase, Resolution};
use pedicab_core::effect::{DelayId, Effect};
use pedicab_core::reducer::{Reduced, Reducer};
use std::marker::PhantomData;

/// Cancellation key of the countdown timer.
///
/// There is only ever one logical timer per engine: re-arming under this id
/// replaces the previous delay, and every transition out of `Pending`
/// cancels it.
pub const COUNTDOWN: DelayId = DelayId("countdown");

/// What an accepted negotiation action produces.
type NegotiationReduced = Reduced<NegotiationAction, Notification>;

/// Reducer implementing the offer/request state machine.
///
/// `Idle → Pending` on a valid selection, `Pending → Pending` on each tick,
/// and `Pending → Resolved(…) → Idle` on timeout, cancellation, accept, or
/// decline. Resolution collapses into `Idle` within the same transition.
///
/// Generic over the environment type `E` so any clock implementation works,
/// mirroring the other reducers in this workspace.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationReducer<E> {
    _phantom: PhantomData<E>,
}

impl<E> NegotiationReducer<E> {
    /// Create a new negotiation reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<E> Default for NegotiationReducer<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the pending negotiation, stopping the countdown.
///
/// Shared by cancel/accept/decline; `idle_rejection` is what the command
/// reports when nothing is pending.
fn resolve_pending(
    state: &mut NegotiationState,
    resolution: Resolution,
    idle_rejection: Rejection,
) -> Result<NegotiationReduced, Rejection> {
    let Phase::Pending { selected, .. } = state.phase else {
        return Err(idle_rejection);
    };

    state.phase = Phase::Idle;
    state.generation += 1;

    Ok(Reduced::notify(Notification::Resolved {
        id: selected,
        resolution,
    })
    .with_effect(Effect::CancelDelay { id: COUNTDOWN }))
}

impl<E: NegotiationEnvironment> Reducer for NegotiationReducer<E> {
    type State = NegotiationState;
    type Action = NegotiationAction;
    type Notification = Notification;
    type Rejection = Rejection;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<NegotiationReduced, Rejection> {
        match action {
            NegotiationAction::Select { id } => {
                if state.phase.is_pending() {
                    return Err(Rejection::AlreadyPending);
                }
                match state.catalog.get(id) {
                    None => return Err(Rejection::UnknownId),
                    Some(entry) if !entry.available => return Err(Rejection::NotAvailable),
                    Some(_) => {},
                }

                state.generation += 1;
                let remaining_seconds = state.config.countdown_seconds();
                state.phase = Phase::Pending {
                    selected: id,
                    remaining_seconds,
                    initiated_at: env.clock().now(),
                };

                Ok(Reduced::notify(Notification::Selected {
                    id,
                    remaining_seconds,
                })
                .with_effect(Effect::delay(
                    COUNTDOWN,
                    state.config.tick_period(),
                    NegotiationAction::Tick {
                        generation: state.generation,
                    },
                )))
            },

            NegotiationAction::Tick { generation } => {
                // A tick from an arming that has since been cancelled or
                // resolved carries a stale generation: drop it. Not a
                // rejection; the timer is not a caller.
                if generation != state.generation {
                    return Ok(Reduced::none());
                }
                let Phase::Pending {
                    selected,
                    remaining_seconds,
                    initiated_at,
                } = state.phase
                else {
                    return Ok(Reduced::none());
                };

                let remaining_seconds = remaining_seconds.saturating_sub(1);
                if remaining_seconds > 0 {
                    state.phase = Phase::Pending {
                        selected,
                        remaining_seconds,
                        initiated_at,
                    };
                    Ok(Reduced::notify(Notification::Tick {
                        id: selected,
                        remaining_seconds,
                    })
                    .with_effect(Effect::delay(
                        COUNTDOWN,
                        state.config.tick_period(),
                        NegotiationAction::Tick { generation },
                    )))
                } else {
                    // The zero tick is the timeout: exactly one Resolved
                    // notification, then straight back to Idle. The delay
                    // that fired is spent, so there is nothing to cancel.
                    state.phase = Phase::Idle;
                    state.generation += 1;
                    Ok(Reduced::notify(Notification::Resolved {
                        id: selected,
                        resolution: Resolution::TimedOut,
                    }))
                }
            },

            NegotiationAction::Cancel => {
                resolve_pending(state, Resolution::Cancelled, Rejection::NothingToCancel)
            },

            NegotiationAction::Accept => {
                resolve_pending(state, Resolution::Accepted, Rejection::NothingPending)
            },

            NegotiationAction::Decline => {
                resolve_pending(state, Resolution::Declined, Rejection::NothingPending)
            },

            NegotiationAction::ReplaceCatalog { catalog } => {
                state.catalog = catalog;
                Ok(Reduced::none())
            },
        }
    }
}
