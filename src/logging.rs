use tracing_subscriber::{fmt, EnvFilter};

use crate::core::paths::env;

/// Install the stderr subscriber. `RUST_LOG` wins over `default_filter`;
/// `WELLNODE_LOG_JSON=1` switches to JSON lines.
pub fn init_logging_with(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let use_json = std::env::var(env::LOG_JSON)
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .pretty()
            .with_writer(std::io::stderr)
            .try_init();
    }
}

pub fn init_logging() {
    init_logging_with("wellnode=info");
}
