use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Default poll period.
pub const DEFAULT_PERIOD_MS: u64 = 300;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between tick deadlines, in milliseconds.
    pub period_ms: u64,
    /// Halt after this many failed ticks in a row. `None` polls forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            max_consecutive_failures: None,
        }
    }
}

impl PollerConfig {
    pub const fn with_period_ms(period_ms: u64) -> Self {
        Self {
            period_ms,
            max_consecutive_failures: None,
        }
    }

    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}
