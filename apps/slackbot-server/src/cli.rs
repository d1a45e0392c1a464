//! CLI argument parsing.
//!
//! With no subcommand the bot runs; `check` and `save-config` are operator
//! tools that never connect to Slack.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use slackbot_core::ConfigResolver;

use crate::runner;

/// Slack bot answering messages, slash commands and events over Socket Mode.
#[derive(Debug, Parser)]
#[command(name = "slackbot")]
#[command(author, version, about)]
pub struct Cli {
    /// Config file to load instead of probing the working directory.
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Subcommand to execute (defaults to `run`).
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect to Slack and handle events until interrupted.
    Run,

    /// Resolve and validate the configuration, then print a masked summary.
    Check,

    /// Write the resolved configuration to a file (format from its extension).
    SaveConfig {
        /// Destination file, e.g. `config.yaml`.
        path: PathBuf,
    },
}

impl Cli {
    /// Executes the parsed CLI command.
    pub async fn run(self) -> Result<()> {
        let resolver = ConfigResolver::new();
        let config = self.config.as_deref();

        match self.command.unwrap_or(Commands::Run) {
            Commands::Run => runner::run(&resolver, config, &[]).await,
            Commands::Check => runner::check(&resolver, config),
            Commands::SaveConfig { path } => runner::save_config(&resolver, config, &path),
        }
    }
}
