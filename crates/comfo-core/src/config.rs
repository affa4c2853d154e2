// ── Runtime coordinator configuration ──
//
// Tuning knobs for one coordinator instance. Built by the embedding
// application and handed in -- the core never reads config files.

use std::time::Duration;

/// Configuration for a single [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Fixed interval between periodic refreshes.
    pub poll_interval: Duration,
    /// Cooldown after a refresh execution; demand arriving inside the
    /// window coalesces into at most one execution when it closes.
    pub debounce_cooldown: Duration,
    /// Execute the first request of a burst immediately instead of
    /// waiting out a cooldown first.
    pub immediate: bool,
    /// Budget for one whole refresh batch (all six group fetches
    /// together, not per call).
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            debounce_cooldown: Duration::from_secs(2),
            immediate: true,
            request_timeout: Duration::from_secs(10),
        }
    }
}
