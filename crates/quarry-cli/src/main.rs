//! # quarry
//!
//! Fetches collection artifacts from a Galaxy registry and core runtime
//! sdists from a package index.
//!
//! This is the entry point: it parses the command line, sets up logging,
//! loads settings and dispatches to the command handlers.

use clap::{Parser, Subcommand};
use quarry_core::error::{QuarryError, QuarryResult};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Fetch and verify collections and core runtime sources
#[derive(Parser)]
#[command(name = "quarry", version, about = "Fetch and verify collections and core runtime sources")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ~/.config/quarry/config.toml)
    #[arg(short, long, global = true, env = "QUARRY_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override a setting, e.g. --set max_retries=3
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the published versions of a collection
    Versions {
        /// Collection as <namespace>.<name>
        collection: String,
    },
    /// Show collection metadata as JSON
    Info {
        collection: String,
    },
    /// Download exact collection releases
    Download {
        /// Releases as <namespace>.<name>:<version>
        #[arg(required = true)]
        requirements: Vec<String>,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
    },
    /// Resolve the highest version matching a constraint
    Latest {
        collection: String,
        /// Version constraint, e.g. ">=1.0.0,<2.0.0"
        #[arg(default_value = "*")]
        constraint: String,
        /// Accept a prerelease when no release matches
        #[arg(long)]
        pre: bool,
        /// Also download the resolved release into this directory
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },
    /// Produce a core runtime sdist
    Core {
        /// @devel, @latest or an exact version
        #[arg(default_value = "@latest")]
        selector: String,
        /// Local source tree to build when it satisfies the selector
        #[arg(long)]
        source: Option<PathBuf>,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting quarry v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_cli(cli) {
        eprintln!("{}", ErrorFormatter::new().format_error(&e));
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> QuarryResult<()> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| QuarryError::Io {
        message: "Failed to create async runtime".to_string(),
        source: e,
    })?;

    rt.block_on(async {
        let ctx = CommandContext::load(cli.config.as_deref(), &cli.overrides).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_filter = [
        "quarry",
        "quarry_core",
        "quarry_config",
        "quarry_registry",
        "quarry_cache",
        "quarry_acquire",
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("quarry encountered an unexpected error: {}", panic_info);
        eprintln!("quarry crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
