//! Slash command listeners.
//!
//! Every command acknowledges its envelope before replying through the
//! command's `response_url`.

use slackbot_core::Config;
use tracing::{debug, instrument};

use super::pick;
use crate::error::ServerError;
use crate::registry::{Context, ListenerRegistry};

const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything! 🧪",
    "Why did the programmer quit his job? He didn't get arrays! 💻",
    "Why do programmers prefer dark mode? Because light attracts bugs! 🐛",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem! 💡",
    "Why did the database administrator break up with the developer? Too many relationship issues! 💔",
    "What's a programmer's favorite hangout place? Foo Bar! 🍻",
    "Why do Java developers wear glasses? Because they can't C#! 👓",
    "How do you comfort a JavaScript bug? You console it! 🐞",
];

const ECHO_USAGE: &str = "Please provide some text to echo! Usage: `/echo your message here`";

const PONG: &str = "🏓 Pong! Bot is alive and responsive!";

/// Registers the slash command listeners.
///
/// `/joke` is only registered when the `joke_commands` feature is on.
pub fn register(registry: &mut ListenerRegistry, config: &Config) -> Result<(), ServerError> {
    registry.command("/echo", echo);
    if config.feature_enabled("joke_commands") {
        registry.command("/joke", joke);
    } else {
        debug!("joke_commands disabled, /joke not registered");
    }
    registry.command("/ping", ping).command("/about", about);
    Ok(())
}

/// Reply for `/echo <text>`; empty text gets the usage hint.
pub fn echo_reply(text: &str) -> String {
    if text.trim().is_empty() {
        ECHO_USAGE.to_string()
    } else {
        format!("🔄 You said: {text}")
    }
}

pub fn about_text(name: &str, version: &str) -> String {
    format!(
        "🤖 *About {name}*\n\n\
         • Version: {version}\n\
         • Features: Message responses, slash commands, events\n\
         • Status: Online and ready to help!\n\n\
         Just say \"help\" in a message to see what I can do."
    )
}

#[instrument(skip_all, fields(user = ctx.user()))]
async fn echo(ctx: Context) -> Result<(), ServerError> {
    ctx.ack()?;
    ctx.respond(&echo_reply(ctx.text())).await
}

async fn joke(ctx: Context) -> Result<(), ServerError> {
    ctx.ack()?;
    ctx.respond(pick(JOKES)).await
}

async fn ping(ctx: Context) -> Result<(), ServerError> {
    ctx.ack()?;
    ctx.respond(PONG).await
}

async fn about(ctx: Context) -> Result<(), ServerError> {
    ctx.ack()?;
    let text = about_text(&ctx.config().bot_name(), &ctx.config().bot_version());
    ctx.respond(&text).await
}
