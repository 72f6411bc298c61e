//! Configuration for the negotiation engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default countdown before a pending negotiation times out.
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 30;

/// Default period between countdown ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// The two knobs the engine recognizes: how long to wait before automatic
/// timeout, and how often the countdown ticks.
///
/// # Example
///
/// ```
/// use pedicab_negotiation::NegotiationConfig;
/// use std::time::Duration;
///
/// let config = NegotiationConfig::new()
///     .with_countdown_seconds(10)
///     .with_tick_period(Duration::from_millis(250));
/// assert_eq!(config.countdown_seconds(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationConfig {
    countdown_seconds: u32,
    tick_period: Duration,
}

impl NegotiationConfig {
    /// Create a configuration with the defaults (30 s countdown, 1 s tick).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    /// Set the countdown duration in whole seconds.
    ///
    /// A countdown of zero still arms the timer: the negotiation times out
    /// on its first tick.
    #[must_use]
    pub const fn with_countdown_seconds(mut self, seconds: u32) -> Self {
        self.countdown_seconds = seconds;
        self
    }

    /// Set the tick period (timer resolution).
    #[must_use]
    pub const fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Countdown duration in whole seconds.
    #[must_use]
    pub const fn countdown_seconds(&self) -> u32 {
        self.countdown_seconds
    }

    /// Period between ticks.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.tick_period
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self::new()
    }
}
