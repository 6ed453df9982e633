pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tripsmith_core::config::{ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "tripsmith",
    about = "Conversational trip planner",
    long_about = "Plan a trip by chatting: destination, dates, budget and preferences are \
                  collected turn by turn, then a day-by-day itinerary is generated.",
    after_help = "Examples:\n  tripsmith\n  tripsmith chat --no-animation\n  \
                  tripsmith doctor --json\n  tripsmith --model gemini-1.5-flash config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a tripsmith.toml configuration file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Language model to use for this run")]
    model: Option<String>,
    #[arg(long, global = true, help = "Log level: trace, debug, info, warn or error")]
    log_level: Option<String>,
    #[arg(long, global = true, value_enum, help = "Log output format")]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive planning session (default)")]
    Chat {
        #[arg(long, help = "Print replies at once instead of revealing them word by word")]
        no_animation: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate configuration and credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        overrides: ConfigOverrides {
            llm_model: cli.model,
            log_level: cli.log_level,
            log_format: cli.log_format.map(LogFormat::from),
        },
    };

    let result = match cli.command.unwrap_or(Command::Chat { no_animation: false }) {
        Command::Chat { no_animation } => commands::chat::run(options, !no_animation),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
