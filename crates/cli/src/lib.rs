pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rebate_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "rebate",
    about = "Rebate discount engine operator CLI",
    long_about = "Resolve discounts for product snapshots, validate campaign files, and inspect settings.",
    after_help = "Examples:\n  rebate resolve --input cart.json --now 2025-06-01T12:00:00Z\n  rebate validate --input campaigns.json\n  rebate config"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Settings file (defaults to rebate.toml or config/rebate.toml)"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Resolve the winning campaign and discounted price for one product snapshot")]
    Resolve {
        #[arg(long, help = "JSON file with `product`, `campaigns` and optional `context`")]
        input: PathBuf,
        #[arg(long, help = "Evaluation instant as RFC 3339; defaults to the snapshot or now")]
        now: Option<String>,
    },
    #[command(about = "Validate every campaign in a JSON file without pricing anything")]
    Validate {
        #[arg(long, help = "JSON file with a `campaigns` array")]
        input: PathBuf,
    },
    #[command(about = "Inspect effective settings values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(cli.config) }
        }
        Command::Resolve { input, now } => match commands::load_config("resolve", cli.config) {
            Ok(config) => {
                init_logging(&config);
                commands::resolve::run(&config, &input, now.as_deref())
            }
            Err(failure) => failure,
        },
        Command::Validate { input } => match commands::load_config("validate", cli.config) {
            Ok(config) => {
                init_logging(&config);
                commands::validate::run(&config, &input)
            }
            Err(failure) => failure,
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
