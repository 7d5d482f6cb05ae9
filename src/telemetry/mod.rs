mod config;

pub use config::{LogFormat, TelemetryConfig};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. Later calls are no-ops.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}. Using oaslint=info.", config.filter, e);
        EnvFilter::new("oaslint=info")
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.with_line_number(true).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Subscriber already installed");
    }
}
