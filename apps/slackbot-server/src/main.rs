//! Slackbot: a Slack Socket Mode bot.
//!
//! Connects to Slack via outbound WebSocket (Socket Mode), matches incoming
//! messages, slash commands and events against registered listeners and
//! replies through the Web API. Configuration comes from a JSON/YAML file or
//! the environment (see `slackbot-core`).

mod cli;
mod dispatch;
mod error;
mod factory;
mod handlers;
mod registry;
mod runner;
mod slack_client;
mod socket;
mod state;
#[cfg(test)]
mod test_support;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Cli::parse().run().await
}
