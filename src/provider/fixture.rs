//! FixtureProvider - in-process provider backed by a JSON description.
//!
//! Stands in for the browser extension in the CLI and in tests.
//!
//! ```json
//! {
//!   "name": "lace-fixture",
//!   "apiVersion": "1.1.0",
//!   "enabled": false,
//!   "rejectEnable": false,
//!   "serviceUris": { "indexerUri": "http://127.0.0.1:8088/api/v1/graphql" },
//!   "state": { "address": "mn_addr_test1...", "coinPublicKey": "..." }
//! }
//! ```

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};

use super::{RawWalletState, ServiceUriConfig, WalletApi, WalletProvider};
use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureSpec {
    pub name: String,
    pub api_version: String,
    pub enabled: bool,
    pub reject_enable: bool,
    pub service_uris: ServiceUriConfig,
    pub state: Value,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        Self {
            name: "fixture".into(),
            api_version: "1.0.0".into(),
            enabled: false,
            reject_enable: false,
            service_uris: ServiceUriConfig::default(),
            state: Value::Null,
        }
    }
}

pub struct FixtureProvider {
    name: String,
    spec: RwLock<FixtureSpec>,
    state: Arc<RwLock<Value>>,
}

impl FixtureProvider {
    pub fn new(spec: FixtureSpec) -> Self {
        let state = Arc::new(RwLock::new(spec.state.clone()));
        Self { name: spec.name.clone(), spec: RwLock::new(spec), state }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let spec: FixtureSpec = serde_json::from_str(raw).context("fixture json")?;
        Ok(Self::new(spec))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read fixture {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Replace the state seen by every capability handed out so far.
    pub fn set_state(&self, state: Value) {
        *self.state.write().unwrap_or_else(|p| p.into_inner()) = state;
    }

    pub fn spec(&self) -> FixtureSpec {
        self.spec.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl WalletProvider for FixtureProvider {
    fn name(&self) -> &str { &self.name }

    fn api_version(&self) -> String { self.spec().api_version }

    async fn is_enabled(&self) -> SessionResult<bool> { Ok(self.spec().enabled) }

    async fn enable(&self) -> SessionResult<Arc<dyn WalletApi>> {
        let mut spec = self.spec.write().unwrap_or_else(|p| p.into_inner());
        if spec.reject_enable {
            return Err(SessionError::EnableRejected(format!("{} declined authorization", spec.name)));
        }
        spec.enabled = true;
        Ok(Arc::new(FixtureApi { state: self.state.clone() }))
    }

    async fn service_uri_config(&self) -> SessionResult<ServiceUriConfig> {
        Ok(self.spec().service_uris)
    }
}

/// Capability handed out by [`FixtureProvider`].
pub struct FixtureApi {
    state: Arc<RwLock<Value>>,
}

#[async_trait]
impl WalletApi for FixtureApi {
    async fn state(&self) -> SessionResult<RawWalletState> {
        Ok(RawWalletState(self.state.read().unwrap_or_else(|p| p.into_inner()).clone()))
    }
}
