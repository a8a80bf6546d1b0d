//! Logging initialization.
//!
//! Crates in this workspace only emit `tracing` events; the binary calls
//! [`init_logging`] once at startup to decide where they go.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. With `json` the subscriber writes
/// one JSON object per line, otherwise compact text. Logs go to stderr so
/// command output on stdout stays machine-readable.
///
/// Calling this twice is harmless: the second call leaves the first
/// subscriber in place.
///
/// ```ignore
/// init_logging("info", false);
/// tracing::info!("client ready");
/// ```
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };

    if let Err(error) = result {
        tracing::debug!(error = %error, "Tracing subscriber already installed");
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
