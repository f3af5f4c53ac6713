//! Wellnode CLI - drive a wallet session against a fixture provider
//!
//!   wellnode detect  --fixture <file>   → {"detected": true, "slot": "midnight.mnLace", ...}
//!   wellnode connect --fixture <file>   → handshake, print URIs + first snapshot, disconnect
//!   wellnode watch   --fixture <file>   → connect, stream snapshots as JSON lines until Ctrl+C
//!
//! Options:
//!   --slot <ns.key>        Injection slot (default midnight.mnLace)
//!   --interval-ms <ms>     Poll interval (default 15000, or WELLNODE_POLL_INTERVAL_MS)
//!   --range <range>        Accepted API versions (default 1.x)
//!   --chain <id>           Chain id stamped on snapshots
//!   --enable-only          Skip version negotiation (degraded fallback)
//!   --pretty               Pretty-print JSON (default for tty)
//!
//! In `watch` mode the fixture file is re-read on every poll, so editing its
//! `state` shows up in the stream.

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use wellnode::logging::init_logging;
use wellnode::{
    install_signal_handlers, Connection, FixtureProvider, ProviderRegistry, SessionConfig, WalletSession,
    WalletState,
};

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("wellnode {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("detect") => cmd_detect(&opts),
        Some("connect") => cmd_connect(&opts).await,
        Some("watch") => cmd_watch(&opts).await,
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || std::io::stdout().is_terminal();
    match result {
        Ok(Value::Null) => {}
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": format!("{:#}", e)}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    fixture: Option<PathBuf>,
    slot: Option<String>,
    interval_ms: Option<u64>,
    range: Option<String>,
    chain: Option<String>,
    enable_only: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--pretty" => opts.pretty = true,
                "--enable-only" => opts.enable_only = true,
                "--fixture" | "-f" => { opts.fixture = value.map(PathBuf::from); i += 1; }
                "--slot" => { opts.slot = value; i += 1; }
                "--interval-ms" => { opts.interval_ms = value.and_then(|v| v.parse().ok()); i += 1; }
                "--range" => { opts.range = value; i += 1; }
                "--chain" => { opts.chain = value; i += 1; }
                other if opts.command.is_none() && !other.starts_with('-') => opts.command = Some(other.to_string()),
                other => debug!("Ignoring argument {}", other),
            }
            i += 1;
        }
        opts
    }

    fn config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = SessionConfig::from_env();
        if let Some(ms) = self.interval_ms {
            config = config.with_poll_interval(Duration::from_millis(ms.max(1)));
        }
        if let Some(range) = &self.range {
            config = config.with_compatible_range(range.parse().map_err(|e: String| anyhow!(e))?);
        }
        if let Some(chain) = &self.chain {
            config = config.with_chain_id(chain.clone());
        }
        Ok(config)
    }

    fn fixture(&self) -> anyhow::Result<&Path> {
        self.fixture.as_deref().ok_or_else(|| anyhow!("--fixture <file> is required"))
    }
}

fn print_usage() {
    println!(
        r#"wellnode - wallet session layer

USAGE:
    wellnode <command> --fixture <file> [options]

COMMANDS:
    detect     Inject the fixture and report what detection finds
    connect    Run the handshake once and print URIs + state
    watch      Connect and stream state snapshots until Ctrl+C

OPTIONS:
    -f, --fixture <file>   Fixture provider JSON
        --slot <ns.key>    Injection slot [default: midnight.mnLace]
        --interval-ms <ms> Poll interval
        --range <range>    Accepted API versions [default: 1.x]
        --chain <id>       Chain id for snapshots
        --enable-only      Skip version negotiation
        --pretty           Pretty-print JSON
    -h, --help             Show this help
    -V, --version          Show version

ENVIRONMENT:
    WELLNODE_POLL_INTERVAL_MS, WELLNODE_API_RANGE, WELLNODE_CHAIN_ID
    WELLNODE_LOG_JSON=1    JSON logs on stderr
    RUST_LOG               Log filter [default: wellnode=info]"#
    );
}

/// Load the fixture, inject it at the requested slot, and build a session.
fn open_session(opts: &ParsedArgs) -> anyhow::Result<(WalletSession, Arc<FixtureProvider>)> {
    let provider = Arc::new(FixtureProvider::from_file(opts.fixture()?)?);
    let registry = ProviderRegistry::new();
    match opts.slot.as_deref() {
        Some(slot) => {
            let (ns, key) = slot.split_once('.').with_context(|| format!("slot must be <namespace>.<key>, got {slot}"))?;
            registry.inject(ns, key, provider.clone());
        }
        None => registry.inject_lace(provider.clone()),
    }
    Ok((WalletSession::new(registry, opts.config()?), provider))
}

async fn connect(session: &WalletSession, opts: &ParsedArgs) -> anyhow::Result<Connection> {
    let conn = if opts.enable_only { session.connect_enable_only().await } else { session.connect().await };
    Ok(conn?)
}

fn state_json(state: &Option<WalletState>) -> Value {
    serde_json::to_value(state).unwrap_or(Value::Null)
}

fn cmd_detect(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let (session, _) = open_session(opts)?;
    Ok(json!({
        "detected": session.detect(),
        "slot": session.provider_slot(),
        "apiVersion": session.api_version(),
        "compatible": session.api_version().is_some_and(|v| session.config().compatible_range.accepts(&v)),
        "range": session.config().compatible_range.as_str(),
    }))
}

async fn cmd_connect(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let (session, _) = open_session(opts)?;
    let conn = connect(&session, opts).await?;
    let state = session.wallet_state().await;
    let enabled = session.is_connected().await;
    session.disconnect();
    Ok(json!({
        "status": "connected",
        "enabled": enabled,
        "uris": conn.uris,
        "state": state_json(&state),
    }))
}

async fn cmd_watch(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let (session, provider) = open_session(opts)?;
    let pretty = opts.pretty;
    let _conn_sub = session.on_connection_change(move |connected| {
        println!("{}", render(&json!({"event": "connection", "connected": connected}), pretty));
    });
    let _state_sub = session.on_state_change(move |state| {
        println!("{}", render(&json!({"event": "state", "state": state_json(state)}), pretty));
    });

    let shutdown = install_signal_handlers();
    let teardown = shutdown.attach(session.clone());

    connect(&session, opts).await?;
    session.refresh().await;

    // Mirror fixture edits into the provider ahead of each poll.
    let path = opts.fixture()?.to_path_buf();
    let every = session.config().poll_interval;
    let reload = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match FixtureProvider::from_file(&path) {
                Ok(fresh) => provider.set_state(fresh.spec().state),
                Err(e) => tracing::warn!("Fixture reload failed: {:#}", e),
            }
        }
    });

    shutdown.wait().await;
    reload.abort();
    teardown.await.map_err(|e| anyhow!("teardown task: {}", e))?;
    if session.status() != wellnode::SessionStatus::Disconnected {
        bail!("session still active after shutdown");
    }
    Ok(Value::Null)
}
