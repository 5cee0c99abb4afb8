//! Engine tuning knobs.

use std::time::Duration;

/// Configuration for hold lifetimes and the expiry sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// TTL applied when a hold request does not specify one.
    pub default_hold_ttl: Duration,
    /// Upper bound for a requested TTL or extension.
    pub max_hold_ttl: Duration,
    /// How often the background sweeper looks for due holds.
    pub sweep_interval: Duration,
    /// How long released, expired and consumed holds stay queryable.
    pub hold_retention: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_hold_ttl: Duration::from_secs(5 * 60),
            max_hold_ttl: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(1),
            hold_retention: Duration::from_secs(15 * 60),
        }
    }
}
