mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blockbuild_lib::config::{Config, Environment, RunContext};
use blockbuild_lib::layout::Layout;

use crate::output::{OutputFormat, Status, status};

/// blockbuild - incremental build orchestrator for gradle modules
#[derive(Parser)]
#[command(name = "blockbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the build configuration
  #[arg(short, long, global = true, default_value = "config.json")]
  config: PathBuf,

  /// Workspace root containing mods/ (default: current directory)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build changed modules and publish the bundle into out/
  Run {
    /// Kill any external command running longer than this (e.g. "20m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show which modules would be rebuilt, without building
  Plan {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Print the packwiz descriptor for a published file
  Lookup {
    /// Path of the file relative to the published root (e.g. "alpha/alpha-1.0.jar")
    path: String,

    /// Read a local hashes.txt instead of fetching the published one
    #[arg(long)]
    hashes: Option<PathBuf>,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = dispatch(cli) {
    status(Status::Failed, &format!("{:#}", e));
    std::process::exit(1);
  }
}

fn dispatch(cli: Cli) -> Result<()> {
  let config = Config::load(&cli.config).with_context(|| format!("Failed to load {}", cli.config.display()))?;

  match cli.command {
    Commands::Run { timeout, output } => cmd::cmd_run(context(config, cli.root)?, timeout, output),
    Commands::Plan { output } => cmd::cmd_plan(context(config, cli.root)?, output),
    Commands::Lookup { path, hashes } => cmd::cmd_lookup(&config, &path, hashes.as_deref()),
  }
}

fn context(config: Config, root: Option<PathBuf>) -> Result<RunContext> {
  let root = match root {
    Some(root) => root,
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };
  let layout = Layout::absolute(&root).with_context(|| format!("Failed to resolve workspace root {}", root.display()))?;
  Ok(RunContext::new(config, Environment::from_process(), layout))
}
