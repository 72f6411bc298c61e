//! # Pedicab Core
//!
//! Core traits and types for the pedicab negotiation engine.
//!
//! This crate provides the fundamental abstractions shared by the runtime
//! store and the domain crates:
//!
//! - **State**: domain state for a feature, owned data behind the store
//! - **Action**: all possible inputs to a reducer (caller commands and
//!   internal timer callbacks)
//! - **Reducer**: pure function `(State, Action, Environment) → Reduced`
//! - **Effect**: side effect descriptions (not execution): scheduling
//!   and cancelling delayed actions
//! - **Environment**: injected dependencies via traits (the clock)
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: reducers never perform I/O or touch
//!   timers; they return [`effect::Effect`] values the runtime executes
//! - Unidirectional data flow: commands in, notifications out
//! - Rejected commands leave state untouched and report a typed reason
//!   instead of panicking
//!
//! ## Example
//!
//! ```ignore
//! use pedicab_core::{effect::Effect, reducer::{Reduced, Reducer}};
//!
//! impl Reducer for OfferReducer {
//!     type State = OfferState;
//!     type Action = OfferAction;
//!     type Notification = OfferNotification;
//!     type Rejection = OfferRejection;
//!     type Environment = OfferEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut OfferState,
//!         action: OfferAction,
//!         env: &OfferEnvironment,
//!     ) -> Result<Reduced<OfferAction, OfferNotification>, OfferRejection> {
//!         // Business logic goes here
//!         Ok(Reduced::none())
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the core trait for business logic.
///
/// Reducers are pure functions: `(State, Action, Environment) → Reduced`.
/// They contain all state-transition logic and are deterministic and
/// testable without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// What an accepted action produced: effect descriptions for the runtime
    /// to execute, and notifications for observers to consume.
    ///
    /// Notifications are facts about a transition (a selection was made, a
    /// countdown ticked, a negotiation timed out). The runtime broadcasts
    /// them after the state change is committed; reducers never talk to
    /// channels directly.
    #[derive(Debug)]
    pub struct Reduced<Action, Notification> {
        /// Side effects to be executed by the runtime.
        pub effects: SmallVec<[Effect<Action>; 2]>,

        /// Facts to broadcast to observers.
        pub notifications: SmallVec<[Notification; 2]>,
    }

    impl<A, N> Reduced<A, N> {
        /// An accepted action with nothing to execute or announce.
        #[must_use]
        pub fn none() -> Self {
            Self {
                effects: SmallVec::new(),
                notifications: SmallVec::new(),
            }
        }

        /// Start from a single notification.
        #[must_use]
        pub fn notify(notification: N) -> Self {
            let mut reduced = Self::none();
            reduced.notifications.push(notification);
            reduced
        }

        /// Add an effect.
        #[must_use]
        pub fn with_effect(mut self, effect: Effect<A>) -> Self {
            self.effects.push(effect);
            self
        }

        /// Add a notification.
        #[must_use]
        pub fn with_notification(mut self, notification: N) -> Self {
            self.notifications.push(notification);
            self
        }
    }

    impl<A, N> Default for Reduced<A, N> {
        fn default() -> Self {
            Self::none()
        }
    }

    /// The Reducer trait - core abstraction for business logic.
    ///
    /// # Contract
    ///
    /// `reduce` either accepts the action, mutating state in place and
    /// returning the effects and notifications the transition produced, or
    /// rejects it with a typed reason. **A rejected action must leave state
    /// exactly as it found it.** Rejections are recoverable-by-caller
    /// conditions, never fatal; reducers do not panic.
    ///
    /// # Type Parameters
    ///
    /// - `State`: the domain state this reducer operates on
    /// - `Action`: the action type this reducer processes
    /// - `Notification`: facts emitted for observers
    /// - `Rejection`: why a command was refused
    /// - `Environment`: injected dependencies (e.g. the clock)
    pub trait Reducer {
        /// The state type this reducer operates on.
        type State;

        /// The action type this reducer processes.
        type Action;

        /// Facts emitted by accepted transitions.
        type Notification;

        /// Why a command was refused.
        type Rejection;

        /// The environment type with injected dependencies.
        type Environment;

        /// Reduce an action into state changes, effects, and notifications.
        ///
        /// # Errors
        ///
        /// Returns the reducer's `Rejection` when the action's precondition
        /// does not hold (e.g. selecting while another negotiation is
        /// pending). State is unchanged on rejection.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Reduced<Self::Action, Self::Notification>, Self::Rejection>;
    }
}

/// Effect module - side effect descriptions.
///
/// Effects describe side effects to be performed by the runtime. They are
/// values (not execution): a reducer that wants a countdown tick in one
/// second returns [`Effect::Delay`] and the store owns the timer.
pub mod effect {
    use std::time::Duration;

    /// Identifier for a scheduled delay, used to cancel or replace it.
    ///
    /// Scheduling a delay under an id that is already scheduled replaces
    /// (aborts) the previous one, so a logical timer like "the countdown"
    /// is always at most one task.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DelayId(pub &'static str);

    impl std::fmt::Display for DelayId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /// Effect type - describes a side effect to be executed.
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the store.
    #[derive(Debug)]
    pub enum Effect<Action> {
        /// No-op effect.
        None,

        /// Dispatch `action` back into the store after `duration`.
        ///
        /// The delay is registered under `id` and can be stopped with
        /// [`Effect::CancelDelay`] before it fires.
        Delay {
            /// Cancellation key for this delay.
            id: DelayId,
            /// How long to wait.
            duration: Duration,
            /// Action to dispatch after the delay.
            action: Box<Action>,
        },

        /// Stop a scheduled delay before it fires.
        ///
        /// The store aborts the timer synchronously, within the action that
        /// produced this effect; no action from the cancelled delay is
        /// observed afterwards. Cancelling an id with nothing scheduled is a
        /// no-op.
        CancelDelay {
            /// Cancellation key of the delay to stop.
            id: DelayId,
        },
    }

    impl<Action> Effect<Action> {
        /// Schedule `action` to be dispatched after `duration`.
        #[must_use]
        pub fn delay(id: DelayId, duration: Duration, action: Action) -> Self {
            Effect::Delay {
                id,
                duration,
                action: Box::new(action),
            }
        }
    }
}

/// Environment module - dependency injection traits.
///
/// All external dependencies are abstracted behind traits and injected via
/// the Environment parameter. For this engine the only dependency is time.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability.
    ///
    /// Production uses [`SystemClock`]; tests use a fixed clock so
    /// timestamps in state are deterministic.
    pub trait Clock: Send + Sync {
        /// Get the current time.
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
