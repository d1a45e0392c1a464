//! Events API listeners: mentions, channel joins, reactions and new
//! workspace members.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use slackbot_core::Config;
use tracing::{debug, info, instrument, warn};

use crate::error::ServerError;
use crate::registry::{Context, ListenerRegistry};

/// User mention tokens such as `<@U012ABC>`, compiled once on first access.
static MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<@\w+>").ok());

/// Registers the event listeners.
///
/// Channel and team welcomes follow the `welcome_messages` feature;
/// reaction replies follow `reaction_responses`.
pub fn register(registry: &mut ListenerRegistry, config: &Config) -> Result<(), ServerError> {
    registry.event("app_mention", app_mention);

    if config.feature_enabled("welcome_messages") {
        registry.event("member_joined_channel", member_joined_channel);
    }
    if config.feature_enabled("reaction_responses") {
        registry.event("reaction_added", reaction_added);
    }
    if config.feature_enabled("welcome_messages") {
        registry.event("team_join", team_join);
    } else {
        debug!("welcome_messages disabled, join greetings not registered");
    }
    Ok(())
}

/// Removes every user mention from `text` and trims the rest.
pub fn strip_mentions(text: &str) -> String {
    match MENTION.as_ref() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Reply to a mention; an empty remainder gets a nudge toward `help`.
pub fn mention_reply(user: &str, text: &str) -> String {
    let clean = strip_mentions(text);
    if clean.is_empty() {
        format!(
            "Hi <@{user}>! You mentioned me but didn't say anything. \
             Try saying 'help' to see what I can do! 🤖"
        )
    } else {
        format!(
            "Thanks for mentioning me, <@{user}>! You said: '{clean}'. \
             Type 'help' to see my commands! 😊"
        )
    }
}

pub fn channel_welcome(user: &str) -> String {
    format!(
        "Welcome to the channel, <@{user}>! 🎉 I'm your friendly bot assistant. \
         Say 'help' to see what I can do!"
    )
}

/// Reply for a reaction; only `wave` and `robot_face` get one.
pub fn reaction_reply(reaction: &str, user: &str) -> Option<String> {
    match reaction {
        "wave" => Some(format!("👋 Hey there <@{user}>! Thanks for the wave!")),
        "robot_face" => Some("🤖 Beep boop! Robot detected! Thanks for the robot love!".into()),
        _ => None,
    }
}

pub fn team_welcome(user: &str) -> String {
    format!(
        "🎉 Welcome to the team, <@{user}>!\n\n\
         I'm your friendly Slack bot assistant. Here's what I can help you with:\n\
         • Type 'help' to see available commands\n\
         • Use `/joke` for programming humor\n\
         • Use `/echo` to test message responses\n\
         • Just mention me (@bot) in any channel!\n\n\
         Feel free to reach out if you need anything! 🤖"
    )
}

async fn app_mention(ctx: Context) -> Result<(), ServerError> {
    ctx.say(&mention_reply(ctx.user(), ctx.text())).await
}

async fn member_joined_channel(ctx: Context) -> Result<(), ServerError> {
    ctx.say(&channel_welcome(ctx.user())).await
}

async fn reaction_added(ctx: Context) -> Result<(), ServerError> {
    let event = ctx.event();
    let reaction = event.get("reaction").and_then(Value::as_str).unwrap_or_default();
    let Some(reply) = reaction_reply(reaction, ctx.user()) else {
        debug!(reaction, "Ignoring reaction");
        return Ok(());
    };
    let channel = event
        .get("item")
        .and_then(|item| item.get("channel"))
        .and_then(Value::as_str)
        .ok_or_else(|| ServerError::Dispatch("reaction_added event has no item.channel".into()))?;
    ctx.say_in(channel, &reply).await
}

/// Sends the new member a welcome DM. Failures are logged and swallowed;
/// the user may have DMs disabled.
#[instrument(skip_all)]
async fn team_join(ctx: Context) -> Result<(), ServerError> {
    let Some(user) = ctx
        .event()
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(Value::as_str)
    else {
        warn!("team_join event without user id");
        return Ok(());
    };

    match send_welcome_dm(&ctx, user).await {
        Ok(channel) => info!(user, channel, "Sent welcome DM"),
        Err(e) => warn!(user, error = %e, "Could not send welcome DM"),
    }
    Ok(())
}

async fn send_welcome_dm(ctx: &Context, user: &str) -> Result<String, ServerError> {
    let channel = ctx.slack().open_direct_message(user).await?;
    ctx.say_in(&channel, &team_welcome(user)).await?;
    Ok(channel)
}
