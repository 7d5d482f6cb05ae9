use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oaslint")]
#[command(version)]
#[command(about = "OpenAPI linting and policy engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint an OpenAPI / Swagger document
    Lint {
        /// Path to the spec (YAML or JSON)
        spec: PathBuf,

        /// Ruleset file; overrides --preset
        #[arg(short, long)]
        ruleset: Option<PathBuf>,

        /// Built-in preset used when no ruleset is given
        #[arg(short, long, default_value = "recommended")]
        preset: PresetChoice,

        /// Ignore file (`<rule-id>: [<path>]`)
        #[arg(short, long)]
        ignore: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: ReportFormat,

        /// Per-rule timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,

        /// Skip the structural OpenAPI schema check
        #[arg(long)]
        skip_check: bool,

        /// Resolve remote `$ref`s over HTTP
        #[arg(long)]
        remote: bool,
    },

    /// List built-in rules
    Rules {
        #[arg(short, long, default_value = "all")]
        preset: PresetChoice,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetChoice {
    /// Rules marked recommended
    Recommended,
    /// Every built-in rule, OWASP included
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Coloured, human-readable
    Text,
    /// JSON document
    Json,
}
