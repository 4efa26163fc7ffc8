//! kintone-customize-uploader - Command-line interface for kcustomize
//!
//! Provides commands for:
//! - Uploading, applying and deploying a customization manifest
//! - Re-deploying on file changes (`upload --watch`)
//! - Viewing and validating configuration
//! - Generating shell completions

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kcustomize_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod params;

use commands::{completions::CompletionsCommand, config::ConfigCommand, upload::UploadCommand};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "kintone-customize-uploader",
    version,
    about = "Upload JavaScript/CSS customizations to kintone apps"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload, apply and deploy the customization described by a manifest
    Upload(UploadCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Options shared by every command
pub struct GlobalOptions {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub config: Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = match load_config(&cli.command, &config_path) {
        Ok(config) => config,
        Err(e) => {
            get_formatter(cli.json).error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };

    let filter = log_filter(cli.verbose, cli.quiet, &config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let globals = GlobalOptions {
        format,
        quiet: cli.quiet,
        config_path,
        config,
    };

    let result = match cli.command {
        Commands::Upload(cmd) => cmd.execute(&globals).await,
        Commands::Config(cmd) => cmd.execute(&globals).await,
        Commands::Completions(cmd) => cmd.execute(&globals).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            get_formatter(cli.json).error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration a command runs with
///
/// `upload` refuses an unparsable or invalid file. The other commands load
/// leniently so a broken file can still be inspected and repaired.
fn load_config(command: &Commands, path: &Path) -> anyhow::Result<Config> {
    match command {
        Commands::Upload(_) => Config::load_validated(path),
        Commands::Config(_) | Commands::Completions(_) => Ok(Config::load_or_default(path)),
    }
}

/// Picks the log filter: `-q` wins, then `-v` count, then the configured level
///
/// `-v` selects `info`, `-vv` `debug` and `-vvv` or more `trace`.
fn log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
