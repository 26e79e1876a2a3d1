//! Logging setup utilities for the ordertalk services.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the default filter directive for the given crates.
///
/// Every crate gets `default_log_level`; `tower_http` is always included so
/// request traces show up next to the application logs.
pub fn default_directive(crates: &[&str], default_log_level: &str) -> String {
    crates
        .iter()
        .map(|name| name.replace('-', "_"))
        .chain(std::iter::once("tower_http".to_string()))
        .map(|target| format!("{}={}", target, default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `crates` - Crate or binary names whose logs should be enabled (e.g. `["ordertalk-server"]`)
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use ordertalk_shared::logger::setup_logger;
///
/// setup_logger(&["ordertalk-server", "ordertalk-shared"], "info");
/// ```
pub fn setup_logger(crates: &[&str], default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(crates, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::debug!("Logger initialized (default level: {})", default_log_level);
}
