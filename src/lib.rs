//! Wellnode: wallet session layer for the wellness tracker dapp.
//!
//! The mood and medication screens talk to the chain through a wallet
//! extension injected into the page. This crate owns that link: it finds the
//! provider, checks its connector API version, runs the enable handshake and
//! keeps subscribers up to date by polling wallet state.
//!
//! # Architecture
//!
//! ```text
//! WalletSession (entry point)
//!   │
//!   ├── ProviderRegistry (injected global namespace)
//!   │     ├── midnight.mnLace / midnight.lace / midnight.*
//!   │     └── cardano.midnight (legacy)
//!   │
//!   ├── handshake: version check → is_enabled → enable → service URIs
//!   │
//!   ├── Poller (tokio task, one per connection)
//!   │     └── WalletApi::state() → WalletState snapshot
//!   │
//!   └── Listeners
//!         ├── on_connection_change(bool)
//!         └── on_state_change(Option<WalletState>)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Description |
//! |-----------|--------|-------------|
//! | detect | `session.detect()` | Look for an injected provider |
//! | connect | `session.connect().await` | Versioned handshake, start polling |
//! | disconnect | `session.disconnect()` | Stop polling, notify `false` / `None` |
//! | state | `session.wallet_state().await` | Fresh snapshot or `None` |
//! | subscribe | `session.on_state_change(cb)` | Returns a `Subscription` |
//!
//! # Features
//!
//! - `native` - tracing subscriber and signal handling for the CLI
//!
//! # Usage
//!
//! ```ignore
//! use wellnode::{ProviderRegistry, SessionConfig, WalletSession};
//!
//! let registry = ProviderRegistry::new();
//! registry.inject_lace(provider);
//!
//! let session = WalletSession::new(registry, SessionConfig::from_env());
//! let _sub = session.on_state_change(|state| println!("{state:?}"));
//! let conn = session.connect().await?;
//! println!("indexer at {}", conn.uris.indexer_uri);
//! ```

pub mod core;
pub mod error;
pub mod provider;
pub mod runtime;
pub mod session;

#[cfg(feature = "native")]
pub mod logging;

pub use core::version::{ApiVersion, VersionRange};
pub use error::{SessionError, SessionResult};
pub use provider::{
    FixtureProvider, FixtureSpec, ProviderRegistry, RawWalletState, ServiceUriConfig, WalletApi, WalletProvider,
};
pub use runtime::{install_signal_handlers, Shutdown};
pub use session::{
    Balance, Connection, SessionConfig, SessionStatus, Subscription, WalletSession, WalletState,
};
