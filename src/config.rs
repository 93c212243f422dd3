//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum total size of cached values, in estimator units (None = unbounded)
    pub max_size: Option<u64>,
    /// Maximum age of a cached entry (None = entries never expire)
    pub max_age: Option<Duration>,
    /// Interval between background expiry sweeps
    pub sweep_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum total size in bytes (default: unbounded)
    /// - `CACHE_MAX_AGE_SECS` - Maximum entry age in seconds (default: no expiry)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        Self {
            max_size: env::var("CACHE_MAX_SIZE").ok().and_then(|v| v.parse().ok()),
            max_age: env::var("CACHE_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            sweep_interval: Duration::from_secs(
                env::var("CACHE_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: None,
            max_age: None,
            sweep_interval: Duration::from_secs(1),
        }
    }
}
