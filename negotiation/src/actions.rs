//! Actions and rejections for the negotiation lifecycle.

use crate::types::{Catalog, CounterpartyId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Actions processed by the negotiation reducer.
///
/// The first five are caller commands and can be rejected; `Tick` is
/// internal feedback from the countdown timer and is never rejected; a
/// tick that arrives after the phase that armed it has ended is silently
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NegotiationAction {
    /// Offer a ride to / request a ride from the given counterparty.
    ///
    /// Accepted only while idle, and only for a catalog entry whose
    /// `available` flag is set. Arms the countdown.
    Select {
        /// The counterparty to negotiate with.
        id: CounterpartyId,
    },

    /// Abandon the pending negotiation and return to idle.
    Cancel,

    /// Resolve the pending negotiation: the counterparty accepted.
    Accept,

    /// Resolve the pending negotiation: the counterparty declined.
    Decline,

    /// Swap the counterparty catalog.
    ///
    /// A pending negotiation is undisturbed; the catalog is consulted only
    /// at selection time.
    ReplaceCatalog {
        /// The replacement catalog.
        catalog: Catalog,
    },

    /// Internal: one countdown tick elapsed for the given arming.
    Tick {
        /// The countdown generation this tick was armed under.
        generation: u64,
    },
}

/// Why a command was refused.
///
/// These are recoverable-by-caller conditions; the screen decides whether
/// to show a dialog, disable a button, or ignore the press. The engine
/// never escalates them and never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    /// A selection was attempted while a negotiation is already in flight.
    #[error("a negotiation is already pending")]
    AlreadyPending,

    /// The target counterparty's `available` flag is false.
    #[error("counterparty is not available")]
    NotAvailable,

    /// No counterparty with that id exists in the current catalog.
    #[error("no such counterparty in the catalog")]
    UnknownId,

    /// `cancel` was called while idle.
    #[error("no pending negotiation to cancel")]
    NothingToCancel,

    /// `accept` or `decline` was called while idle.
    #[error("no pending negotiation to resolve")]
    NothingPending,
}
