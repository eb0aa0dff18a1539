//! Logging setup.
//!
//! Filter priority: `JSON_TREE_SYNC_LOG`, then `RUST_LOG`, then
//! `warn,json_tree_sync_lib=info`. Output goes to stderr so it never mixes
//! with what the binary prints.

use std::env;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "JSON_TREE_SYNC_LOG";
const DEFAULT_FILTER: &str = "warn,json_tree_sync_lib=info,json_tree_sync=info";

/// Installs the global subscriber. `directives` overrides the environment.
///
/// Returns an error if a subscriber is already installed.
pub fn init(directives: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match directives {
        Some(d) => EnvFilter::try_new(d)?,
        None => create_filter()?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

/// Initialize logging for tests. Safe to call any number of times.
pub fn test() {
    let _ = create_filter().map(|filter| {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
    });
}

fn create_filter() -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    if let Ok(directives) = env::var(LOG_ENV) {
        return EnvFilter::try_new(directives);
    }
    if let Ok(directives) = env::var("RUST_LOG") {
        return EnvFilter::try_new(directives);
    }
    EnvFilter::try_new(DEFAULT_FILTER)
}
