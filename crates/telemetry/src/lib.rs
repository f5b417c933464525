//! Logging and tracing bootstrap.

use anyhow::anyhow;
use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter from `RUST_LOG`, falling back to the configured directive.
pub fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter))
}

/// Install the global tracing subscriber.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(settings));

    let result = match settings.log_format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    result.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(
        target: "bookshelf-telemetry",
        format = ?settings.log_format,
        filter = %settings.filter,
        "telemetry initialized"
    );

    Ok(())
}
