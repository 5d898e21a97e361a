//! Logging initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Default filter directives: quiet dependencies, chatty agent crates.
const DEFAULT_DIRECTIVES: &str = "info,edge=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_DIRECTIVES`]. `RUST_ENV=production`
/// switches to JSON output for log shipping; anything else gets
/// human-readable output. Fails if a subscriber is already installed.
pub fn init_logging() -> AppResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if production() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init()
    };
    installed.map_err(|e| AppError::Logging(e.to_string()))
}

fn production() -> bool {
    std::env::var("RUST_ENV").is_ok_and(|v| v == "production")
}
