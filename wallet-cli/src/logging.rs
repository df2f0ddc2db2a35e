//! Structured logging
//!
//! All log output goes to stderr so stdout stays clean for `--json` output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wallet_core::config::LogFormat;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_level` when set, e.g.
/// `RUST_LOG=wallet_core=debug,tower_http=debug`.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
        return;
    }
    tracing::debug!(?format, "logging initialized");
}
