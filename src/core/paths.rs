//! Well-known names: provider slots, defaults, environment variables.

/// Provider slots in the injected global namespace, in discovery order.
pub mod slots {
    pub const MIDNIGHT: &str = "midnight";
    pub const CARDANO: &str = "cardano";

    pub const MN_LACE: &str = "mnLace";
    pub const LACE: &str = "lace";
    /// Legacy `cardano.midnight` injection point
    pub const LEGACY: &str = "midnight";

    /// Preferred keys under `midnight.*`; any other key is tried after these.
    pub const PREFERRED: &[&str] = &[MN_LACE, LACE];
}

/// Session defaults
pub mod defaults {
    pub const CHAIN_ID: &str = "midnight-testnet";
    pub const API_RANGE: &str = "1.x";
    pub const POLL_INTERVAL_MS: u64 = 15_000;
    pub const DISCOVERY_INTERVAL_MS: u64 = 5_000;
    pub const DISCOVERY_TIMEOUT_MS: u64 = 30_000;
    /// Balance key used when summing raw UTXOs
    pub const DUST_TOKEN: &str = "tdust";
}

/// Environment overrides
pub mod env {
    pub const POLL_INTERVAL_MS: &str = "WELLNODE_POLL_INTERVAL_MS";
    pub const API_RANGE: &str = "WELLNODE_API_RANGE";
    pub const CHAIN_ID: &str = "WELLNODE_CHAIN_ID";
    pub const LOG_JSON: &str = "WELLNODE_LOG_JSON";
}
