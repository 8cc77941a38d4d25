//! Ruletrail - replay entity events through the telemetry middleware and
//! inspect the records it commits.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ruletrail_core::entities::EntityKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod inspect_cli;
mod replay_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "ruletrail",
    about = "Business telemetry for rule evaluation events",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    json: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Dispatch newline-delimited entity envelopes through the telemetry middleware
    Replay {
        /// File with one JSON envelope per line
        file: PathBuf,

        /// Telemetry configuration file
        #[clap(long, default_value = ".ruletrail/telemetry.yml")]
        config: PathBuf,

        /// Make the handler fail for entities of this kind (e.g. "artifact")
        #[clap(long)]
        fail_kind: Option<String>,
    },

    /// Show telemetry records from a JSON-lines telemetry file
    Inspect {
        /// Telemetry file written by the json sink
        file: PathBuf,
    },
}

fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr) // logs to stderr, not stdout
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.json);

    match cli.command {
        Command::Replay {
            file,
            config,
            fail_kind,
        } => {
            let fail_kind = fail_kind
                .map(|k| k.parse::<EntityKind>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let summary = replay_cli::run(&file, &config, fail_kind).await?;
            println!("{summary}");
        }
        Command::Inspect { file } => inspect_cli::run(&file)?,
    }

    Ok(())
}
