//! Poller - background wallet state refresh for a connected session.
//!
//! One task per session epoch. Each tick performs one complete fetch before
//! the next tick is awaited, so fetches never overlap; late ticks are
//! delayed rather than bursted. The task holds only a weak reference to the
//! session and exits once the session is dropped or its epoch moves on.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::state::WalletState;
use super::Inner;
use crate::error::SessionError;
use crate::provider::WalletApi;

pub(super) fn spawn(inner: Weak<Inner>, capability: Arc<dyn WalletApi>, period: Duration, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let chain_id = match inner.upgrade() {
                Some(session) if session.is_current(epoch) => session.config.chain_id.clone(),
                _ => break,
            };
            let snapshot = fetch_snapshot(capability.as_ref(), &chain_id).await;
            match inner.upgrade() {
                Some(session) if session.publish_state(epoch, snapshot) => {}
                _ => break,
            }
        }
        tracing::debug!("Wallet state poller for epoch {} stopped", epoch);
    })
}

/// Query the capability and map the result. Failures, including a panic
/// while mapping provider data, are logged and become `None`.
pub(super) async fn fetch_snapshot(capability: &dyn WalletApi, chain_id: &str) -> Option<WalletState> {
    let raw = match capability.state().await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("{}", SessionError::StateFetch(e.to_string()));
            return None;
        }
    };
    match catch_unwind(AssertUnwindSafe(|| WalletState::from_raw(&raw, chain_id))) {
        Ok(snapshot) => Some(snapshot),
        Err(_) => {
            tracing::warn!("{}", SessionError::StateFetch("provider state could not be mapped".into()));
            None
        }
    }
}
