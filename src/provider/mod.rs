//! Provider - contracts for injected wallet providers
//!
//! A provider is the object a wallet extension injects into the page. The
//! session only ever talks to it through these traits.
//!
//! ```text
//! ProviderRegistry (well-known global namespace)
//!     │
//!     └── WalletProvider ── api_version / is_enabled / service_uri_config
//!             │
//!             └── enable() ──→ WalletApi (capability handle)
//!                                  │
//!                                  └── state() ──→ RawWalletState
//! ```

mod fixture;
mod registry;

pub use fixture::{FixtureApi, FixtureProvider, FixtureSpec};
pub use registry::ProviderRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::SessionResult;

/// Injected provider, before authorization.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;
    /// Advertised connector API version (semantic version)
    fn api_version(&self) -> String;
    async fn is_enabled(&self) -> SessionResult<bool>;
    /// Ask the user to authorize this dapp. Idempotent once granted.
    async fn enable(&self) -> SessionResult<Arc<dyn WalletApi>>;
    async fn service_uri_config(&self) -> SessionResult<ServiceUriConfig>;
}

/// Authorized capability returned by [`WalletProvider::enable`].
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn state(&self) -> SessionResult<RawWalletState>;
}

/// Network endpoints the provider hands to the dapp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceUriConfig {
    pub indexer_uri: String,
    pub indexer_ws_uri: String,
    pub prover_server_uri: String,
    pub substrate_node_uri: String,
}

/// Provider-defined wallet state. Only the address and coin public key
/// fields are guaranteed; everything else is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawWalletState(pub Value);

impl RawWalletState {
    pub fn new(value: Value) -> Self { Self(value) }
    pub fn as_value(&self) -> &Value { &self.0 }
}

impl From<Value> for RawWalletState {
    fn from(value: Value) -> Self { Self(value) }
}
