mod commands;
mod obs;
mod wiring;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{Command, Outcome};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "satwatch")]
#[command(about = "Bitcoin market-conditions collector and dashboard renderer.", version)]
#[command(
    after_help = "Examples:\n  satwatch run --config configs/satwatch.toml\n  satwatch gaps\n  satwatch render --log-format json\n"
)]
struct Cli {
    /// Config file path (TOML). Falls back to env SATWATCH_CONFIG, then built-in defaults.
    #[arg(long, global = true, env = "SATWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CliCommand {
    /// Collect every enabled metric, then render the dashboard (default).
    Run,
    /// Collect every enabled metric and print the tally.
    Collect,
    /// Render the dashboard from the local store only, without network access.
    Render,
    /// Print the missing date ranges per enabled metric without fetching.
    Gaps,
    /// Print the effective configuration as TOML.
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(cli.log_format == LogFormat::Json) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => Command::Run,
        CliCommand::Collect => Command::Collect,
        CliCommand::Render => Command::Render,
        CliCommand::Gaps => Command::Gaps,
        CliCommand::Config => Command::Config,
    };

    match commands::run(command, cli.config.as_deref()) {
        Ok(Outcome::Completed) => {}
        Ok(Outcome::NothingCollected) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
