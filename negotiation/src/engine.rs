//! Engine facade over the negotiation store.

use crate::actions::{NegotiationAction, Rejection};
use crate::config::NegotiationConfig;
use crate::environment::NegotiationEnvironment;
use crate::reducer::NegotiationReducer;
use crate::types::{Catalog, CounterpartyId, NegotiationState, Notification, Phase};
use pedicab_runtime::Store;
use tokio::sync::{broadcast, watch};

/// One ride negotiation at a time, driven to completion or abandonment.
///
/// The engine owns a [`Store`] running the [`NegotiationReducer`] and its
/// countdown timer. Each screen session creates one instance (the
/// driver-side screen over a catalog of passengers, the passenger-side
/// screen over a catalog of drivers) and the two directions share every
/// line of lifecycle logic.
///
/// # Lifetime
///
/// Cloning is cheap (the store is shared). When the last clone is dropped,
/// i.e. the screen session ends, any running countdown timer is aborted, so a
/// torn-down screen can never leak a ticking timer.
///
/// # Example
///
/// ```ignore
/// let engine = NegotiationEngine::new(
///     catalog,
///     NegotiationConfig::new(),
///     ProductionNegotiationEnvironment::system(),
/// );
///
/// let mut notifications = engine.subscribe();
/// engine.select(CounterpartyId::new(1)).await?;
/// while let Ok(notification) = notifications.recv().await {
///     // rerender countdown, surface timeout alert, …
/// }
/// ```
pub struct NegotiationEngine<E: NegotiationEnvironment> {
    store: Store<NegotiationReducer<E>>,
}

impl<E> NegotiationEngine<E>
where
    E: NegotiationEnvironment + 'static,
{
    /// Create an engine over the given catalog.
    #[must_use]
    pub fn new(catalog: Catalog, config: NegotiationConfig, environment: E) -> Self {
        let state = NegotiationState::new(catalog, config);
        Self {
            store: Store::new(state, NegotiationReducer::new(), environment),
        }
    }

    /// Offer a ride to / request a ride from the given counterparty.
    ///
    /// On success the engine is `Pending` with a full countdown and the
    /// timer is running.
    ///
    /// # Errors
    ///
    /// - [`Rejection::AlreadyPending`] while a negotiation is in flight
    /// - [`Rejection::UnknownId`] if `id` is not in the current catalog
    /// - [`Rejection::NotAvailable`] if the entry is not selectable
    #[tracing::instrument(skip(self), name = "negotiation_select")]
    pub async fn select(&self, id: CounterpartyId) -> Result<(), Rejection> {
        self.store.send(NegotiationAction::Select { id }).await
    }

    /// Abandon the pending negotiation.
    ///
    /// The countdown timer is stopped before this returns: no tick and no
    /// timeout can be observed afterwards.
    ///
    /// # Errors
    ///
    /// [`Rejection::NothingToCancel`] while idle (calling twice in a row is
    /// rejected the second time).
    #[tracing::instrument(skip(self), name = "negotiation_cancel")]
    pub async fn cancel(&self) -> Result<(), Rejection> {
        self.store.send(NegotiationAction::Cancel).await
    }

    /// Resolve the pending negotiation as accepted by the counterparty.
    ///
    /// # Errors
    ///
    /// [`Rejection::NothingPending`] while idle.
    #[tracing::instrument(skip(self), name = "negotiation_accept")]
    pub async fn accept(&self) -> Result<(), Rejection> {
        self.store.send(NegotiationAction::Accept).await
    }

    /// Resolve the pending negotiation as declined by the counterparty.
    ///
    /// # Errors
    ///
    /// [`Rejection::NothingPending`] while idle.
    #[tracing::instrument(skip(self), name = "negotiation_decline")]
    pub async fn decline(&self) -> Result<(), Rejection> {
        self.store.send(NegotiationAction::Decline).await
    }

    /// Swap the counterparty catalog.
    ///
    /// A pending negotiation is undisturbed; the catalog is consulted only
    /// at selection time.
    ///
    /// # Errors
    ///
    /// Currently never rejected; the `Result` keeps the command surface
    /// uniform.
    pub async fn replace_catalog(&self, catalog: Catalog) -> Result<(), Rejection> {
        self.store
            .send(NegotiationAction::ReplaceCatalog { catalog })
            .await
    }

    /// Snapshot of the full lifecycle state.
    pub async fn snapshot(&self) -> NegotiationState {
        self.store.state(Clone::clone).await
    }

    /// The current phase.
    pub async fn phase(&self) -> Phase {
        self.store.state(|state| *state.phase()).await
    }

    /// Check whether a negotiation is in flight.
    pub async fn is_pending(&self) -> bool {
        self.store.state(NegotiationState::is_pending).await
    }

    /// The counterparty under negotiation, present iff pending.
    pub async fn selected(&self) -> Option<CounterpartyId> {
        self.store.state(NegotiationState::selected).await
    }

    /// Whole seconds left before timeout (the configured countdown while
    /// idle).
    pub async fn remaining_seconds(&self) -> u32 {
        self.store.state(NegotiationState::remaining_seconds).await
    }

    /// Subscribe to lifecycle notifications (selection, ticks, resolution).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.store.subscribe()
    }

    /// Watch the full state, republished after every transition and tick.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<NegotiationState> {
        self.store.watch_state()
    }
}

impl<E: NegotiationEnvironment> Clone for NegotiationEngine<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
