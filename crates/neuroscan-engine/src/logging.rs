use tracing_subscriber::EnvFilter;

use crate::config::non_empty_env;

pub const DEFAULT_LOG_FILTER: &str = "warn,neuroscan=info";

/// Installs the global stderr subscriber. Safe to call more than once; only
/// the first call takes effect.
pub fn init_logging() {
    let filter = non_empty_env("NEUROSCAN_LOG")
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
