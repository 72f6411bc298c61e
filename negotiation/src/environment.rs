//! Environment trait for the negotiation reducer.

use pedicab_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Environment dependencies for the negotiation reducer.
///
/// Dependency injection via traits, as everywhere in this workspace: the
/// reducer asks the environment for the time instead of reading the system
/// clock, so tests can pin timestamps.
pub trait NegotiationEnvironment: Send + Sync {
    /// Clock for stamping selections.
    ///
    /// Production uses `SystemClock`, tests use `FixedClock`.
    fn clock(&self) -> &dyn Clock;
}

/// Production environment for the negotiation engine.
#[derive(Clone)]
pub struct ProductionNegotiationEnvironment {
    clock: Arc<dyn Clock>,
}

impl ProductionNegotiationEnvironment {
    /// Create an environment around the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Create an environment on the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl NegotiationEnvironment for ProductionNegotiationEnvironment {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
