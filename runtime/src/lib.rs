//! # Pedicab Runtime
//!
//! Runtime implementation for the pedicab negotiation engine.
//!
//! This crate provides the [`Store`] that coordinates reducer execution and
//! effect handling:
//!
//! - **Store**: owns state behind a lock, runs the reducer, executes effects
//! - **Delay scheduling**: [`Effect::Delay`] spawns a timer task that feeds
//!   its action back into the store; [`Effect::CancelDelay`] aborts it
//!   synchronously
//! - **Observation**: notifications are broadcast after every accepted
//!   action, and the full state is republished on a watch channel
//!
//! ## Example
//!
//! ```ignore
//! use pedicab_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use pedicab_core::effect::{DelayId, Effect};
use pedicab_core::reducer::Reducer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;

/// Default capacity of the notification broadcast channel.
///
/// A countdown produces one notification per second, so observers lag only
/// if they stall for this many seconds.
const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Shared interior of a [`Store`].
///
/// Delay tasks hold a [`Weak`] reference to this; when the last strong
/// handle is dropped the scheduled timers are aborted and any task that
/// outlives the store finds nothing to deliver to.
struct StoreInner<R: Reducer> {
    state: RwLock<R::State>,
    reducer: R,
    environment: R::Environment,

    /// Scheduled delays keyed by their cancellation id.
    ///
    /// A finished task's handle may linger here until the id is scheduled
    /// again or cancelled; aborting a finished handle is a no-op, so that is
    /// harmless.
    delays: Mutex<HashMap<DelayId, JoinHandle<()>>>,

    /// Notification fan-out for observers (screens, tests).
    notifications: broadcast::Sender<R::Notification>,

    /// Full state snapshot, republished after every accepted action.
    state_watch: watch::Sender<R::State>,
}

impl<R: Reducer> Drop for StoreInner<R> {
    fn drop(&mut self) {
        let delays = self
            .delays
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (id, handle) in delays.drain() {
            tracing::debug!(delay_id = %id, "Aborting scheduled delay on store drop");
            handle.abort();
        }
    }
}

/// The Store - runtime coordinator for a reducer.
///
/// The Store manages:
/// 1. State (behind an async `RwLock` for concurrent access)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (delay timers with synchronous cancellation)
///
/// # Concurrency
///
/// Commands and timer callbacks both enter through [`Store::send`], which
/// runs the reducer under the state write lock, so the two trigger sources
/// never interleave on the same state. Effects produced by an accepted
/// action are executed before `send` returns: scheduling a delay spawns its
/// timer task, and cancelling one aborts the task immediately, so no action
/// from a cancelled delay is observed after the cancelling command returns.
///
/// Cloning a `Store` is cheap (shared interior). Dropping the last clone
/// aborts every scheduled delay.
pub struct Store<R: Reducer> {
    inner: Arc<StoreInner<R>>,
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + Send + Sync + 'static,
    R::Action: Send + 'static,
    R::Notification: Clone + Send + 'static,
    R::Rejection: Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment.
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self::with_broadcast_capacity(
            initial_state,
            reducer,
            environment,
            DEFAULT_BROADCAST_CAPACITY,
        )
    }

    /// Create a new store with a custom notification broadcast capacity.
    ///
    /// Increase the capacity if observers are slow to drain notifications
    /// (the default buffers 16).
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: R::State,
        reducer: R,
        environment: R::Environment,
        capacity: usize,
    ) -> Self {
        let (notifications, _) = broadcast::channel(capacity);
        let (state_watch, _) = watch::channel(initial_state.clone());

        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                delays: Mutex::new(HashMap::new()),
                notifications,
                state_watch,
            }),
        }
    }

    /// Send an action to the store.
    ///
    /// This is the only way state changes:
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer with (state, action, environment)
    /// 3. On acceptance: republishes the state snapshot, broadcasts the
    ///    transition's notifications, and executes its effects
    ///
    /// All of that happens before `send` returns, still under the write
    /// lock, so concurrent senders observe transitions in a single total
    /// order and a cancelled delay can never fire afterwards.
    ///
    /// # Errors
    ///
    /// Returns the reducer's rejection when the action's precondition does
    /// not hold. State, notifications, and scheduled delays are untouched.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: R::Action) -> Result<(), R::Rejection> {
        metrics::counter!("store.actions.total").increment(1);

        let mut state = self.inner.state.write().await;
        tracing::trace!("Acquired write lock on state");

        let start = std::time::Instant::now();
        let reduced = self
            .inner
            .reducer
            .reduce(&mut state, action, &self.inner.environment);
        metrics::histogram!("store.reducer.duration_seconds")
            .record(start.elapsed().as_secs_f64());

        let reduced = match reduced {
            Ok(reduced) => reduced,
            Err(rejection) => {
                tracing::debug!("Action rejected by reducer");
                metrics::counter!("store.actions.rejected").increment(1);
                return Err(rejection);
            },
        };

        tracing::trace!(
            effects = reduced.effects.len(),
            notifications = reduced.notifications.len(),
            "Reducer accepted action"
        );

        // Snapshot first, then notifications, so an observer woken by a
        // notification already sees the state that produced it.
        self.inner.state_watch.send_replace(state.clone());
        for notification in reduced.notifications {
            // Send fails only when no observer is subscribed.
            let _ = self.inner.notifications.send(notification);
        }
        for effect in reduced.effects {
            self.execute_effect(effect);
        }

        Ok(())
    }

    /// Read current state via a closure.
    ///
    /// Access state through a closure to ensure the lock is released
    /// promptly:
    ///
    /// ```ignore
    /// let remaining = store.state(|s| s.remaining_seconds()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Subscribe to notifications broadcast by accepted actions.
    ///
    /// Only notifications sent after subscribing are received; a slow
    /// receiver that overflows the channel observes a `Lagged` error rather
    /// than blocking the store.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<R::Notification> {
        self.inner.notifications.subscribe()
    }

    /// Watch the full state, republished after every accepted action.
    ///
    /// Unlike [`Store::subscribe`] this always holds the latest snapshot,
    /// which suits render-the-current-state consumers.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<R::State> {
        self.inner.state_watch.subscribe()
    }

    /// Execute a single effect description.
    ///
    /// Runs synchronously within [`Store::send`]: delays spawn their timer
    /// task immediately and cancellations abort theirs before this returns.
    fn execute_effect(&self, effect: Effect<R::Action>) {
        match effect {
            Effect::None => {
                tracing::trace!("Executing Effect::None (no-op)");
            },
            Effect::Delay {
                id,
                duration,
                action,
            } => {
                tracing::trace!(delay_id = %id, ?duration, "Scheduling delay");
                metrics::counter!("store.delays.scheduled").increment(1);

                // The timer holds only a weak handle: a dropped store means
                // the delayed action has nowhere to go and the task exits.
                let weak: Weak<StoreInner<R>> = Arc::downgrade(&self.inner);
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    if let Some(inner) = weak.upgrade() {
                        tracing::trace!("Delay elapsed, dispatching action");
                        let store = Store { inner };
                        let _ = store.send(*action).await;
                    }
                });

                let mut delays = self
                    .inner
                    .delays
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if let Some(previous) = delays.insert(id, handle) {
                    // Re-arming a logical timer replaces the previous task.
                    previous.abort();
                }
            },
            Effect::CancelDelay { id } => {
                tracing::trace!(delay_id = %id, "Cancelling delay");
                metrics::counter!("store.delays.cancelled").increment(1);

                let removed = self
                    .inner
                    .delays
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .remove(&id);
                if let Some(handle) = removed {
                    handle.abort();
                }
            },
        }
    }
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
