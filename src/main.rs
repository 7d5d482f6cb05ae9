use clap::Parser;
use oaslint::{
    cli::{Cli, Commands},
    commands::{self, LintOptions},
    telemetry::{self, TelemetryConfig},
};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry(&TelemetryConfig::from_env());
    let cli = Cli::parse();

    match cli.command {
        Commands::Lint {
            spec,
            ruleset,
            preset,
            ignore,
            format,
            timeout_ms,
            skip_check,
            remote,
        } => {
            let options = LintOptions {
                spec,
                ruleset,
                preset,
                ignore,
                format,
                timeout: Duration::from_millis(timeout_ms),
                skip_check,
                allow_lookup: remote,
            };
            if commands::execute_lint(&options).await? {
                std::process::exit(1);
            }
        }
        Commands::Rules { preset } => {
            commands::execute_rules(preset)?;
        }
    }

    Ok(())
}
