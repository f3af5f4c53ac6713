//! WalletSession - discovery, version-checked handshake, polled state
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect()──→ Connecting ──ok──→ Connected
//!      ▲                          │                  │
//!      └──────────err─────────────┘                  │
//!      └──────────────disconnect() / destroy()───────┘
//! ```
//!
//! `Connecting` only exists inside a single `connect()` call. There is no
//! reconnect: callers invoke `connect()` again after a failure.
//!
//! # Ordering
//!
//! Every connect and teardown bumps the session epoch. Publications from the
//! poller carry the epoch they were started under and are dropped unless it
//! is still current. The check and the listener calls happen under a
//! dispatch gate that teardown also takes, so once `disconnect()` returns no
//! listener sees output from the old session. The gate is reentrant:
//! listeners may call back into the session.

mod config;
mod listeners;
mod poller;
mod state;

pub use config::SessionConfig;
pub use listeners::{Listeners, Subscription};
pub use state::{derive_address, derive_balances, Balance, WalletState};

use parking_lot::ReentrantMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};

use crate::error::{SessionError, SessionResult};
use crate::provider::{ProviderRegistry, ServiceUriConfig, WalletApi, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
        }
    }
}

/// Result of a successful connect.
#[derive(Clone)]
pub struct Connection {
    pub capability: Arc<dyn WalletApi>,
    pub uris: ServiceUriConfig,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("uris", &self.uris).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Negotiated,
    EnableOnly,
}

struct Detected {
    slot: String,
    provider: Arc<dyn WalletProvider>,
}

struct Active {
    capability: Arc<dyn WalletApi>,
    uris: ServiceUriConfig,
    poller: JoinHandle<()>,
}

struct Slot {
    status: SessionStatus,
    active: Option<Active>,
}

pub(crate) struct Inner {
    registry: ProviderRegistry,
    config: SessionConfig,
    detected: Mutex<Option<Detected>>,
    slot: Mutex<Slot>,
    epoch: AtomicU64,
    gate: ReentrantMutex<()>,
    connection_listeners: Listeners<bool>,
    state_listeners: Listeners<Option<WalletState>>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Deliver a poll result. Returns false once `epoch` is stale.
    fn publish_state(&self, epoch: u64, snapshot: Option<WalletState>) -> bool {
        let _gate = self.gate.lock();
        if !self.is_current(epoch) {
            tracing::debug!("Discarding wallet state from stale epoch {}", epoch);
            return false;
        }
        self.state_listeners.notify(&snapshot);
        true
    }

    /// Drop the active session. Bumps the epoch so in-flight connects and
    /// poll results are discarded. Returns whether anything was active.
    fn teardown(&self, notify: bool) -> bool {
        let _gate = self.gate.lock();
        let (was_active, poller) = {
            let mut slot = self.slot();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            let was_active = slot.status != SessionStatus::Disconnected;
            slot.status = SessionStatus::Disconnected;
            (was_active, slot.active.take().map(|a| a.poller))
        };
        if let Some(poller) = poller {
            poller.abort();
        }
        if notify {
            self.connection_listeners.notify(&false);
            self.state_listeners.notify(&None);
        }
        was_active
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(active) = self.slot().active.take() {
            active.poller.abort();
        }
    }
}

/// Session with an injected wallet provider. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<Inner>,
}

impl WalletSession {
    /// Build a session over `registry` and run an initial `detect()`.
    pub fn new(registry: ProviderRegistry, config: SessionConfig) -> Self {
        let session = Self {
            inner: Arc::new(Inner {
                registry,
                config,
                detected: Mutex::new(None),
                slot: Mutex::new(Slot { status: SessionStatus::Disconnected, active: None }),
                epoch: AtomicU64::new(0),
                gate: ReentrantMutex::new(()),
                connection_listeners: Listeners::new("connection"),
                state_listeners: Listeners::new("state"),
            }),
        };
        session.detect();
        session
    }

    pub fn config(&self) -> &SessionConfig { &self.inner.config }

    fn detected(&self) -> MutexGuard<'_, Option<Detected>> {
        self.inner.detected.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.detected().as_ref().map(|d| d.provider.clone())
    }

    /// Look for a provider in the registry. Only updates the held reference.
    pub fn detect(&self) -> bool {
        let found = self.inner.registry.discover();
        let mut detected = self.detected();
        match found {
            Some((slot, provider)) => {
                if detected.as_ref().map(|d| d.slot.as_str()) != Some(slot.as_str()) {
                    tracing::debug!("Wallet provider '{}' detected at {}", provider.name(), slot);
                }
                *detected = Some(Detected { slot, provider });
                true
            }
            None => {
                *detected = None;
                false
            }
        }
    }

    pub fn is_detected(&self) -> bool { self.detected().is_some() }

    /// Slot the held provider was found at, e.g. `midnight.mnLace`.
    pub fn provider_slot(&self) -> Option<String> {
        self.detected().as_ref().map(|d| d.slot.clone())
    }

    /// Re-run detection until a provider appears or the discovery timeout
    /// elapses. Covers extensions that inject after the page loads.
    pub async fn wait_for_provider(&self) -> bool {
        if self.detect() {
            return true;
        }
        let every = self.inner.config.discovery_interval;
        let found = timeout(self.inner.config.discovery_timeout, async {
            let mut ticker = interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                if self.detect() {
                    return;
                }
            }
        })
        .await
        .is_ok();
        if found {
            tracing::info!("Wallet provider detected after polling");
        } else {
            tracing::info!("No wallet provider after {:?}", self.inner.config.discovery_timeout);
        }
        found
    }

    pub fn api_version(&self) -> Option<String> {
        self.provider().map(|p| p.api_version())
    }

    pub fn status(&self) -> SessionStatus { self.inner.slot().status }

    /// Connect using the versioned handshake: version check, `is_enabled`,
    /// `enable`, `service_uri_config`. All-or-nothing.
    pub async fn connect(&self) -> SessionResult<Connection> {
        self.connect_with(Flow::Negotiated).await
    }

    /// Degraded fallback without version negotiation. Service URIs are best
    /// effort. Prefer [`connect`](Self::connect).
    pub async fn connect_enable_only(&self) -> SessionResult<Connection> {
        self.connect_with(Flow::EnableOnly).await
    }

    async fn connect_with(&self, flow: Flow) -> SessionResult<Connection> {
        let Some(provider) = self.provider() else {
            tracing::error!("Failed to connect to wallet: {}", SessionError::ProviderNotFound);
            return Err(SessionError::ProviderNotFound);
        };

        if self.status() == SessionStatus::Connected {
            self.disconnect();
        }
        let epoch = {
            let mut slot = self.inner.slot();
            if slot.status == SessionStatus::Connecting {
                return Err(SessionError::AlreadyConnecting);
            }
            slot.status = SessionStatus::Connecting;
            self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        match self.handshake(provider.as_ref(), flow).await.and_then(|c| self.install(epoch, c)) {
            Ok(connection) => {
                tracing::info!("Wallet '{}' connected (api {})", provider.name(), provider.api_version());
                Ok(connection)
            }
            Err(e) => {
                {
                    let mut slot = self.inner.slot();
                    if self.inner.is_current(epoch) {
                        slot.status = SessionStatus::Disconnected;
                    }
                }
                tracing::error!("Failed to connect to wallet: {}", e);
                Err(e)
            }
        }
    }

    async fn handshake(&self, provider: &dyn WalletProvider, flow: Flow) -> SessionResult<Connection> {
        let version = provider.api_version();
        let range = &self.inner.config.compatible_range;
        match flow {
            Flow::Negotiated => {
                if !range.accepts(&version) {
                    return Err(SessionError::IncompatibleVersion { expected: range.to_string(), found: version });
                }
                let enabled = provider.is_enabled().await.map_err(as_rejection)?;
                tracing::debug!("Provider reports enabled={}", enabled);
                let capability = provider.enable().await.map_err(as_rejection)?;
                let uris = provider
                    .service_uri_config()
                    .await
                    .map_err(|e| SessionError::ServiceUris(e.to_string()))?;
                Ok(Connection { capability, uris })
            }
            Flow::EnableOnly => {
                tracing::warn!("Connecting without version negotiation (provider api {})", version);
                match provider.is_enabled().await {
                    Ok(enabled) => tracing::debug!("Provider reports enabled={}", enabled),
                    Err(e) => tracing::warn!("is_enabled failed: {}", e),
                }
                let capability = provider.enable().await.map_err(as_rejection)?;
                let uris = provider.service_uri_config().await.unwrap_or_else(|e| {
                    tracing::warn!("Using default service URIs: {}", e);
                    ServiceUriConfig::default()
                });
                Ok(Connection { capability, uris })
            }
        }
    }

    /// Store the session and start polling, unless a disconnect arrived
    /// while the handshake was in flight.
    fn install(&self, epoch: u64, connection: Connection) -> SessionResult<Connection> {
        let _gate = self.inner.gate.lock();
        {
            let mut slot = self.inner.slot();
            if !self.inner.is_current(epoch) {
                return Err(SessionError::Cancelled);
            }
            let poller = poller::spawn(
                Arc::downgrade(&self.inner),
                connection.capability.clone(),
                self.inner.config.poll_interval,
                epoch,
            );
            slot.active = Some(Active { capability: connection.capability.clone(), uris: connection.uris.clone(), poller });
            slot.status = SessionStatus::Connected;
        }
        self.inner.connection_listeners.notify(&true);
        Ok(connection)
    }

    /// Stop polling, drop the capability, notify `false` and `None`. Safe to
    /// call when already disconnected; listeners are notified either way.
    pub fn disconnect(&self) {
        if self.inner.teardown(true) {
            tracing::info!("Wallet disconnected");
        }
    }

    /// Teardown without notifications. Clears both listener sets and forgets
    /// the provider.
    pub fn destroy(&self) {
        self.inner.teardown(false);
        self.inner.connection_listeners.clear();
        self.inner.state_listeners.clear();
        *self.detected() = None;
    }

    fn capability(&self) -> Option<(u64, Arc<dyn WalletApi>)> {
        let slot = self.inner.slot();
        slot.active.as_ref().map(|a| (self.inner.epoch.load(Ordering::SeqCst), a.capability.clone()))
    }

    /// Current wallet state, or `None` when disconnected or the fetch fails.
    pub async fn wallet_state(&self) -> Option<WalletState> {
        let (_, capability) = self.capability()?;
        poller::fetch_snapshot(capability.as_ref(), &self.inner.config.chain_id).await
    }

    /// Fetch now and publish to state listeners outside the poll schedule.
    pub async fn refresh(&self) -> Option<WalletState> {
        let (epoch, capability) = self.capability()?;
        let snapshot = poller::fetch_snapshot(capability.as_ref(), &self.inner.config.chain_id).await;
        self.inner.publish_state(epoch, snapshot.clone());
        snapshot
    }

    /// Whether the provider still considers this dapp enabled.
    pub async fn is_connected(&self) -> bool {
        if self.capability().is_none() {
            return false;
        }
        let Some(provider) = self.provider() else { return false };
        provider.is_enabled().await.unwrap_or_else(|e| {
            tracing::error!("Error checking wallet connection: {}", e);
            false
        })
    }

    pub fn service_uri_config(&self) -> Option<ServiceUriConfig> {
        self.inner.slot().active.as_ref().map(|a| a.uris.clone())
    }

    pub fn on_connection_change(&self, callback: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.inner.connection_listeners.subscribe(callback)
    }

    pub fn on_state_change(&self, callback: impl Fn(&Option<WalletState>) + Send + Sync + 'static) -> Subscription {
        self.inner.state_listeners.subscribe(callback)
    }
}

fn as_rejection(e: SessionError) -> SessionError {
    match e {
        SessionError::EnableRejected(_) => e,
        other => SessionError::EnableRejected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FixtureProvider, FixtureSpec};
    use serde_json::json;

    fn session_with(spec: FixtureSpec) -> WalletSession {
        let registry = ProviderRegistry::new();
        registry.inject_lace(Arc::new(FixtureProvider::new(spec)));
        WalletSession::new(registry, SessionConfig::default())
    }

    #[test]
    fn status_names() {
        assert_eq!(SessionStatus::Connecting.as_str(), "connecting");
    }

    #[test]
    fn new_session_runs_detection() {
        let session = session_with(FixtureSpec::default());
        assert!(session.is_detected());
        assert_eq!(session.provider_slot().as_deref(), Some("midnight.mnLace"));
        assert_eq!(session.api_version().as_deref(), Some("1.0.0"));
        assert_eq!(session.status(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn enable_only_accepts_any_version() {
        let session = session_with(FixtureSpec {
            api_version: "3.0.0".into(),
            state: json!({"address": "mn1"}),
            ..Default::default()
        });
        assert!(matches!(session.connect().await, Err(SessionError::IncompatibleVersion { .. })));
        let conn = session.connect_enable_only().await.unwrap();
        assert_eq!(conn.uris, ServiceUriConfig::default());
        assert_eq!(session.status(), SessionStatus::Connected);
        assert_eq!(session.wallet_state().await.unwrap().address.as_deref(), Some("mn1"));
        session.disconnect();
    }

    #[test]
    fn rejection_mapping_keeps_reason() {
        let e = as_rejection(SessionError::Provider("timeout".into()));
        assert_eq!(e, SessionError::EnableRejected("Provider error: timeout".into()));
        let e = as_rejection(SessionError::EnableRejected("user said no".into()));
        assert_eq!(e.to_string(), "Wallet authorization rejected: user said no");
    }
}
