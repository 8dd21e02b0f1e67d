use tracing_subscriber::EnvFilter;

use crate::config;

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level;
/// calling this more than once is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::config().logging.level.as_str()));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!crate::is_production!())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(environment = ?config::config().environment, "telemetry initialized");
    }
}
