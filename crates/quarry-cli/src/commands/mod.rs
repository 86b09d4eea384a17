//! Command implementations and dispatch logic.
//!
//! Each command is an async `execute` function taking a `CommandContext`.

use quarry_config::{ConfigLoader, Settings};
use quarry_core::error::{QuarryError, QuarryResult};
use quarry_registry::{GalaxyClient, RetryingClient};
use std::path::Path;
use tracing::info;

pub mod download;
pub mod info;
pub mod latest;
pub mod runtime;
pub mod versions;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub settings: Settings,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Load settings from the config file, environment and `--set` overrides
    pub async fn load(config: Option<&Path>, overrides: &[String]) -> QuarryResult<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = config {
            loader = loader.with_config_file(path);
        }
        for (key, value) in parse_overrides(overrides)? {
            loader = loader.with_override(&key, value);
        }

        Ok(Self {
            settings: loader.load().await?,
            output: OutputHandler::new(),
        })
    }

    /// Registry client for the configured Galaxy server
    pub async fn galaxy(&self) -> QuarryResult<GalaxyClient> {
        let http = RetryingClient::from_settings(&self.settings)?;
        GalaxyClient::connect(http, &self.settings.galaxy_base()?).await
    }
}

/// Split `KEY=VALUE` overrides
pub fn parse_overrides(raw: &[String]) -> QuarryResult<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| QuarryError::ConfigValidation {
                    field: "--set".to_string(),
                    reason: format!("expected KEY=VALUE, got '{}'", entry),
                })
        })
        .collect()
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> QuarryResult<()> {
    match command {
        Commands::Versions { collection } => {
            info!("Listing versions of {}", collection);
            versions::execute(&collection, ctx).await
        },
        Commands::Info { collection } => {
            info!("Fetching metadata of {}", collection);
            info::execute(&collection, ctx).await
        },
        Commands::Download { requirements, dest } => {
            info!("Downloading {} release(s) to {}", requirements.len(), dest.display());
            download::execute(&requirements, &dest, ctx).await
        },
        Commands::Latest {
            collection,
            constraint,
            pre,
            dest,
        } => {
            info!("Resolving {} {} (prereleases: {})", collection, constraint, pre);
            latest::execute(&collection, &constraint, pre, dest.as_deref(), ctx).await
        },
        Commands::Core {
            selector,
            source,
            dest,
        } => {
            info!("Acquiring core runtime {}", selector);
            runtime::execute(&selector, source.as_deref(), &dest, ctx).await
        },
    }
}
