use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

// Installs the global subscriber. RUST_LOG overrides the configured filter.
// Returns false when a subscriber was already installed (tests call this repeatedly).
pub fn init_tracing(config: &LogConfig) -> bool {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.filter.clone());

    let result = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(env_filter))
            .with_target(false)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(env_filter))
            .try_init()
    };

    result.is_ok()
}
