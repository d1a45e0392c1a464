//! Replies to plain channel messages.

use slackbot_core::Config;

use super::pick;
use crate::error::ServerError;
use crate::registry::{Context, ListenerRegistry, Trigger};

const HELP_TEXT: &str = "\
🤖 *Available Commands:*
• Say `hello` - I'll greet you back
• Say `help` - Shows this help message
• Use `/echo <text>` - I'll echo your text back
• Use `/joke` - I'll tell you a joke
• Mention me in any channel and I'll respond!";

const FAREWELLS: &[&str] = &[
    "Adios",
    "Au revoir",
    "Farewell",
    "See you later!",
    "Until next time!",
];

/// `{user}` is replaced with the author mention.
const THANKS_REPLIES: &[&str] = &[
    "You're welcome, {user}! 😊",
    "Happy to help, {user}! 🎉",
    "No problem at all, {user}! ✨",
    "Anytime, {user}! 🤖",
];

/// Registers the message listeners.
///
/// # Errors
///
/// Returns `ServerError::Dispatch` if a trigger pattern fails to compile.
pub fn register(registry: &mut ListenerRegistry, _config: &Config) -> Result<(), ServerError> {
    registry
        .message(Trigger::text("hello"), hello)
        .message(Trigger::pattern("help")?, help)
        .message(Trigger::text("goodbye"), goodbye)
        .message(Trigger::pattern("thanks|thank you")?, thanks);
    Ok(())
}

pub fn greeting(user: &str) -> String {
    format!("Hey there <@{user}>! 👋")
}

pub fn farewell(parting: &str) -> String {
    format!("{parting}! 👋")
}

pub fn thanks_reply(template: &str, user: &str) -> String {
    template.replace("{user}", &format!("<@{user}>"))
}

async fn hello(ctx: Context) -> Result<(), ServerError> {
    ctx.say(&greeting(ctx.user())).await
}

async fn help(ctx: Context) -> Result<(), ServerError> {
    ctx.say(HELP_TEXT).await
}

async fn goodbye(ctx: Context) -> Result<(), ServerError> {
    ctx.say(&farewell(pick(FAREWELLS))).await
}

async fn thanks(ctx: Context) -> Result<(), ServerError> {
    ctx.say(&thanks_reply(pick(THANKS_REPLIES), ctx.user())).await
}
