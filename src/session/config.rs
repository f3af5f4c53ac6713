//! Session Configuration - passed from higher layers

use std::time::Duration;

use crate::core::paths::{defaults, env};
use crate::core::version::VersionRange;

/// Session configuration. Higher layers construct this.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wallet state poll period once connected
    pub poll_interval: Duration,
    /// Accepted provider API versions
    pub compatible_range: VersionRange,
    /// Chain id stamped on every snapshot
    pub chain_id: String,
    /// How often `wait_for_provider` re-runs detection
    pub discovery_interval: Duration,
    /// When `wait_for_provider` gives up
    pub discovery_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            compatible_range: VersionRange::default(),
            chain_id: defaults::CHAIN_ID.into(),
            discovery_interval: Duration::from_millis(defaults::DISCOVERY_INTERVAL_MS),
            discovery_timeout: Duration::from_millis(defaults::DISCOVERY_TIMEOUT_MS),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self { Self::default() }

    /// Defaults overridden by `WELLNODE_*` environment variables. Malformed
    /// values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(env::POLL_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval = Duration::from_millis(ms),
                _ => tracing::warn!("Ignoring {}={:?}", env::POLL_INTERVAL_MS, raw),
            }
        }
        if let Ok(raw) = std::env::var(env::API_RANGE) {
            match raw.parse() {
                Ok(range) => config.compatible_range = range,
                Err(e) => tracing::warn!("Ignoring {}: {}", env::API_RANGE, e),
            }
        }
        if let Ok(chain) = std::env::var(env::CHAIN_ID) {
            if !chain.trim().is_empty() { config.chain_id = chain.trim().to_string(); }
        }
        config
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self { self.poll_interval = interval; self }
    pub fn with_compatible_range(mut self, range: VersionRange) -> Self { self.compatible_range = range; self }
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self { self.chain_id = chain_id.into(); self }
    pub fn with_discovery(mut self, interval: Duration, timeout: Duration) -> Self {
        self.discovery_interval = interval;
        self.discovery_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_connector_service() {
        let c = SessionConfig::default();
        assert_eq!(c.poll_interval, Duration::from_secs(15));
        assert_eq!(c.compatible_range.as_str(), "1.x");
        assert_eq!(c.chain_id, "midnight-testnet");
        assert_eq!(c.discovery_interval, Duration::from_secs(5));
        assert_eq!(c.discovery_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_overrides() {
        let c = SessionConfig::new()
            .with_poll_interval(Duration::from_secs(30))
            .with_compatible_range(VersionRange::major(2))
            .with_chain_id("midnight-devnet")
            .with_discovery(Duration::from_secs(1), Duration::from_secs(3));
        assert_eq!(c.poll_interval, Duration::from_secs(30));
        assert!(c.compatible_range.accepts("2.1.0"));
        assert_eq!(c.chain_id, "midnight-devnet");
        assert_eq!(c.discovery_timeout, Duration::from_secs(3));
    }
}
