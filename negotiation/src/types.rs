//! Core types for the negotiation lifecycle.

use crate::config::NegotiationConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a counterparty within a catalog.
///
/// Ids are assigned by whoever supplies the catalog and are stable for the
/// catalog's lifetime. The engine treats them as opaque keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CounterpartyId(u64);

impl CounterpartyId {
    /// Create an id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for CounterpartyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CounterpartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry in the catalog offered to the user (a driver or a passenger,
/// depending on which side of the marketplace instantiated the engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    /// Unique id within the catalog.
    pub id: CounterpartyId,

    /// Whether this entry can currently be selected.
    pub available: bool,

    /// Opaque display string (name, rating, ETA, whatever the screen wants
    /// to show). The engine never inspects it.
    pub label: String,
}

impl Counterparty {
    /// Create an available counterparty.
    #[must_use]
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id: CounterpartyId::new(id),
            available: true,
            label: label.into(),
        }
    }

    /// Mark this entry unavailable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// The externally supplied list of counterparties under consideration.
///
/// The engine only reads from the catalog, to validate a selection, and
/// never mutates it. Ids are unique: [`Catalog::from_entries`] keeps the
/// first occurrence of a duplicated id and drops the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<Counterparty>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a catalog from entries, enforcing id uniqueness.
    ///
    /// Later entries with an already-seen id are dropped with a warning.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = Counterparty>) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            if catalog.get(entry.id).is_some() {
                tracing::warn!(
                    id = %entry.id,
                    "Dropping catalog entry with duplicate id"
                );
                continue;
            }
            catalog.entries.push(entry);
        }
        catalog
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: CounterpartyId) -> Option<&Counterparty> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Iterate the entries in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Counterparty> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently selectable (the screens' "Available (N)"
    /// header stat).
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.available).count()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Counterparty;
    type IntoIter = std::slice::Iter<'a, Counterparty>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Where the lifecycle currently stands.
///
/// `Resolved` is deliberately absent: timeout, cancellation, accept, and
/// decline all pass through resolution and land back on `Idle` within the
/// same transition, so it is never observable as a resting phase. The
/// outcome is reported via [`Notification::Resolved`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    /// No negotiation in flight; the catalog is selectable.
    Idle,

    /// Exactly one counterparty is selected and the countdown is running.
    Pending {
        /// The counterparty under negotiation.
        selected: CounterpartyId,

        /// Whole seconds left before automatic timeout.
        remaining_seconds: u32,

        /// When the selection was made.
        initiated_at: DateTime<Utc>,
    },
}

impl Phase {
    /// Check whether a negotiation is in flight.
    ///
    /// Screens map this flag to their own pending treatment (pulsing card,
    /// spinner, disabled list); animation timing stays on the caller's side.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// How a pending negotiation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// The countdown reached zero without an answer.
    TimedOut,

    /// The selecting party abandoned the negotiation.
    Cancelled,

    /// The counterparty accepted.
    Accepted,

    /// The counterparty declined.
    Declined,
}

/// Facts emitted by lifecycle transitions for presentation-layer
/// consumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// A counterparty was selected and the countdown armed.
    Selected {
        /// The selected counterparty.
        id: CounterpartyId,
        /// Countdown starting value.
        remaining_seconds: u32,
    },

    /// The countdown ticked.
    Tick {
        /// The counterparty under negotiation.
        id: CounterpartyId,
        /// Whole seconds left after this tick.
        remaining_seconds: u32,
    },

    /// The pending negotiation ended; the engine is `Idle` again.
    Resolved {
        /// The counterparty the negotiation was with.
        id: CounterpartyId,
        /// How it ended.
        resolution: Resolution,
    },
}

/// State for the negotiation reducer: one lifecycle per engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationState {
    pub(crate) catalog: Catalog,
    pub(crate) config: NegotiationConfig,
    pub(crate) phase: Phase,

    /// Identifies which arming of the countdown a tick belongs to.
    ///
    /// Bumped on every transition that arms or disarms the countdown; a
    /// tick carrying an older generation is dropped, which closes the race
    /// where a timer had already fired when its cancellation landed.
    pub(crate) generation: u64,
}

impl NegotiationState {
    /// Create an idle state over the given catalog and configuration.
    #[must_use]
    pub const fn new(catalog: Catalog, config: NegotiationConfig) -> Self {
        Self {
            catalog,
            config,
            phase: Phase::Idle,
            generation: 0,
        }
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Check whether a negotiation is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.phase.is_pending()
    }

    /// The counterparty under negotiation, present iff pending.
    #[must_use]
    pub const fn selected(&self) -> Option<CounterpartyId> {
        match self.phase {
            Phase::Pending { selected, .. } => Some(selected),
            Phase::Idle => None,
        }
    }

    /// Whole seconds left before timeout.
    ///
    /// While idle this reports the configured countdown: the value the
    /// next negotiation starts from, which is also what the screens show
    /// on their resting countdown widget.
    #[must_use]
    pub const fn remaining_seconds(&self) -> u32 {
        match self.phase {
            Phase::Pending {
                remaining_seconds, ..
            } => remaining_seconds,
            Phase::Idle => self.config.countdown_seconds(),
        }
    }

    /// The current catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    /// The current countdown generation (see the field docs; exposed so
    /// tests can forge live or stale ticks).
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
