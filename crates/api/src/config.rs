//! Application configuration loaded from environment variables.

use std::time::Duration;

use booking::EngineConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `HOLD_TTL_SECS`: default hold lifetime (default: `300`)
/// - `MAX_HOLD_TTL_SECS`: longest hold or extension a client may ask for (default: `900`)
/// - `SWEEP_INTERVAL_MS`: expiry sweep period (default: `1000`)
/// - `HOLD_RETENTION_SECS`: how long closed holds stay queryable (default: `900`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub hold_ttl_secs: u64,
    pub max_hold_ttl_secs: u64,
    pub sweep_interval_ms: u64,
    pub hold_retention_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            hold_ttl_secs: env_or("HOLD_TTL_SECS", defaults.hold_ttl_secs),
            max_hold_ttl_secs: env_or("MAX_HOLD_TTL_SECS", defaults.max_hold_ttl_secs),
            sweep_interval_ms: env_or("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
            hold_retention_secs: env_or("HOLD_RETENTION_SECS", defaults.hold_retention_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine settings derived from this configuration.
    ///
    /// The default TTL is capped at the maximum so a misconfigured default
    /// cannot produce holds that every request would reject.
    pub fn engine_config(&self) -> EngineConfig {
        let max_hold_ttl = Duration::from_secs(self.max_hold_ttl_secs.max(1));
        EngineConfig {
            default_hold_ttl: Duration::from_secs(self.hold_ttl_secs.max(1)).min(max_hold_ttl),
            max_hold_ttl,
            sweep_interval: Duration::from_millis(self.sweep_interval_ms.max(1)),
            hold_retention: Duration::from_secs(self.hold_retention_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            hold_ttl_secs: 300,
            max_hold_ttl_secs: 900,
            sweep_interval_ms: 1000,
            hold_retention_secs: 900,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
