//! Argument parsing, error handling and command dispatch.

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pixq_core::config::{ConfigError, ConfigManager, EngineBackend, DEFAULT_CONFIG_PATH};
use pixq_core::logging::init_tracing;
use pixq_core::models::TargetFormat;
use pixq_core::orchestrator::OrchestratorError;
use reqwest::Url;

use crate::commands;

#[derive(Parser)]
#[command(
    name = "pixq",
    version,
    about = "Convert batches of images locally, one at a time"
)]
pub(crate) struct Cli {
    /// Config file, created with defaults if missing.
    #[arg(long, global = true, env = "PIXQ_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Increase log verbosity (repeatable). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(
        long = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert images and save the results into the output folder.
    Convert(ConvertArgs),
    /// List supported target formats.
    Formats,
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub(crate) struct ConvertArgs {
    /// Files to convert. `-` reads standard input; http(s) URLs are fetched.
    pub(crate) inputs: Vec<String>,
    /// Additional image URLs to fetch.
    #[arg(long = "url", value_parser = parse_url)]
    pub(crate) urls: Vec<Url>,
    /// Target format (png, jpg/jpeg, webp). Defaults to the configured format.
    #[arg(short, long, value_parser = parse_format)]
    pub(crate) format: Option<TargetFormat>,
    /// Output folder. Defaults to the configured folder.
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Convert only the Nth input (1-based) instead of the whole batch.
    #[arg(long)]
    pub(crate) only: Option<usize>,
    /// Engine backend to use instead of the configured one.
    #[arg(long, value_parser = parse_backend)]
    pub(crate) engine: Option<EngineBackend>,
}

/// Inspect or change the stored configuration.
#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Persist the default target format.
    SetFormat {
        #[arg(value_parser = parse_format)]
        format: TargetFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

/// Shared state handed to every command handler.
pub(crate) struct AppContext {
    pub(crate) config: ConfigManager,
    pub(crate) output: OutputFormat,
}

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    /// The command ran but some records failed or could not be saved.
    Incomplete(String),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Incomplete(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Incomplete(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<OrchestratorError> for CliError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::RecordNotFound { .. } => Self::Validation(err.to_string()),
            other => Self::Failure(anyhow!(other)),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Failure(anyhow::Error::new(err).context("configuration error"))
    }
}

/// Parses CLI arguments, executes the requested command and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    if let Err(err) = config.load_or_create() {
        let err = CliError::from(err);
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    let mut level = config.settings().logging.level;
    for _ in 0..cli.verbose {
        level = level.more_verbose();
    }
    init_tracing(level);
    tracing::debug!("Using config {}", config.path().display());

    let ctx = AppContext {
        config,
        output: cli.output,
    };

    match dispatch(cli.command, ctx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(command: Command, mut ctx: AppContext) -> CliResult<()> {
    match command {
        Command::Convert(args) => commands::convert::handle_convert(&ctx, args).await,
        Command::Formats => commands::formats::handle_formats(ctx.output),
        Command::Config(config) => match config {
            ConfigCommand::Show => commands::config::handle_config_show(&ctx),
            ConfigCommand::SetFormat { format } => {
                commands::config::handle_set_format(&mut ctx, format)
            }
        },
    }
}

pub(crate) fn parse_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|err| format!("invalid URL '{value}': {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported URL scheme '{other}'")),
    }
}

pub(crate) fn parse_format(value: &str) -> Result<TargetFormat, String> {
    value.parse::<TargetFormat>().map_err(|err| err.to_string())
}

pub(crate) fn parse_backend(value: &str) -> Result<EngineBackend, String> {
    value.parse::<EngineBackend>()
}
