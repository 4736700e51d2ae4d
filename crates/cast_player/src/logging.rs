//! Tracing subscriber setup. Logs go to stderr so they never mix with replayed bytes.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// Picks the effective filter: `--verbose` wins, then the configured filter, then the default.
pub fn filter_directive(configured: Option<&str>, verbose: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    configured
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(configured: Option<&str>, verbose: bool) {
    let directive = filter_directive(configured, verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
