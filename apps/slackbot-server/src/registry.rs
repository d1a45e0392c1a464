//! Ordered listener registry and the per-envelope listener context.
//!
//! Listeners are registered against a [`Trigger`] and kept in registration
//! order. For each envelope every matching listener runs, one after the
//! other; a failing or panicking listener is reported to the registry's
//! error handler and the remaining listeners still run.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use slackbot_core::Config;
use tracing::{debug, error, instrument};

use crate::dispatch::Ack;
use crate::error::ServerError;
use crate::slack_client::SlackApi;

/// A boxed listener invocation.
pub type ListenerFuture = BoxFuture<'static, Result<(), ServerError>>;

/// A registered listener.
pub type Listener = Arc<dyn Fn(Context) -> ListenerFuture + Send + Sync>;

/// Receives every listener failure together with the raw envelope payload.
pub type ErrorHandler = Arc<dyn Fn(&ServerError, &Value) + Send + Sync>;

/// A registration group: adds related listeners to the registry.
pub type RegisterFn = fn(&mut ListenerRegistry, &Config) -> Result<(), ServerError>;

static NULL: Value = Value::Null;

/// What an envelope must look like for a listener to run.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// A message event whose text contains this literal (case-sensitive).
    Text(String),
    /// A message event whose text matches this pattern.
    Pattern(Regex),
    /// A slash command with this name, e.g. `/echo`.
    Command(String),
    /// An Events API event of this type, e.g. `app_mention`.
    Event(String),
}

impl Trigger {
    pub fn text(literal: impl Into<String>) -> Self {
        Self::Text(literal.into())
    }

    /// Builds a case-insensitive pattern trigger.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Dispatch` if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self, ServerError> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Pattern)
            .map_err(|e| ServerError::Dispatch(format!("invalid trigger pattern {pattern:?}: {e}")))
    }

    pub fn command(name: impl Into<String>) -> Self {
        Self::Command(name.into())
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self::Event(name.into())
    }

    /// Whether an envelope payload satisfies this trigger.
    pub fn matches(&self, payload: &Value) -> bool {
        let event_type = payload
            .get("event")
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str);
        let message_text = || {
            (event_type == Some("message"))
                .then(|| payload["event"].get("text").and_then(Value::as_str))
                .flatten()
        };

        match self {
            Self::Text(literal) => message_text().is_some_and(|t| t.contains(literal.as_str())),
            Self::Pattern(regex) => message_text().is_some_and(|t| regex.is_match(t)),
            Self::Command(name) => {
                payload.get("command").and_then(Value::as_str) == Some(name.as_str())
            }
            Self::Event(name) => event_type == Some(name.as_str()),
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(literal) => write!(f, "message text {literal:?}"),
            Self::Pattern(regex) => write!(f, "message pattern /{}/", regex.as_str()),
            Self::Command(name) => write!(f, "command {name}"),
            Self::Event(name) => write!(f, "event {name}"),
        }
    }
}

/// Everything a listener needs to handle one envelope.
///
/// Cheap to clone; each listener receives its own copy.
#[derive(Clone)]
pub struct Context {
    slack: Arc<dyn SlackApi>,
    config: Arc<Config>,
    payload: Arc<Value>,
    ack: Ack,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("payload", &self.payload)
            .field("acked", &self.ack.is_sent())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(slack: Arc<dyn SlackApi>, config: Arc<Config>, payload: Value, ack: Ack) -> Self {
        Self {
            slack,
            config,
            payload: Arc::new(payload),
            ack,
        }
    }

    /// The raw envelope payload.
    pub fn body(&self) -> &Value {
        &self.payload
    }

    /// The inner Events API event, or `null` for slash commands.
    pub fn event(&self) -> &Value {
        self.payload.get("event").unwrap_or(&NULL)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn slack(&self) -> &dyn SlackApi {
        self.slack.as_ref()
    }

    /// Message or command text (empty when absent).
    pub fn text(&self) -> &str {
        self.event_or_body_str("text", "text")
    }

    /// ID of the user who triggered the envelope (empty when absent).
    pub fn user(&self) -> &str {
        self.event_or_body_str("user", "user_id")
    }

    /// ID of the channel the envelope belongs to (empty when absent).
    pub fn channel(&self) -> &str {
        self.event_or_body_str("channel", "channel_id")
    }

    /// Slash command name (empty for events).
    pub fn command(&self) -> &str {
        self.payload
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn event_or_body_str(&self, event_key: &str, body_key: &str) -> &str {
        self.event()
            .get(event_key)
            .and_then(Value::as_str)
            .or_else(|| self.payload.get(body_key).and_then(Value::as_str))
            .unwrap_or_default()
    }

    /// Acknowledges the envelope. Repeated calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::WebSocket` if the connection already closed.
    pub fn ack(&self) -> Result<(), ServerError> {
        self.ack.send()
    }

    /// Posts `text` to the channel the envelope came from.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Dispatch` if the envelope names no channel, or
    /// the Slack API error.
    pub async fn say(&self, text: &str) -> Result<(), ServerError> {
        let channel = self.channel();
        if channel.is_empty() {
            return Err(ServerError::Dispatch("envelope has no channel to reply in".into()));
        }
        self.say_in(channel, text).await
    }

    /// Posts `text` to `channel`.
    ///
    /// # Errors
    ///
    /// Returns the Slack API error.
    pub async fn say_in(&self, channel: &str, text: &str) -> Result<(), ServerError> {
        self.slack.post_message(channel, text).await.map(|_ts| ())
    }

    /// Replies to a slash command through its `response_url`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Dispatch` if the envelope was not acknowledged
    /// yet or carries no `response_url`, or the Slack API error.
    pub async fn respond(&self, text: &str) -> Result<(), ServerError> {
        if !self.ack.is_sent() {
            return Err(ServerError::Dispatch(
                "respond called before the envelope was acknowledged".into(),
            ));
        }
        let url = self
            .payload
            .get("response_url")
            .and_then(Value::as_str)
            .ok_or_else(|| ServerError::Dispatch("envelope has no response_url".into()))?;
        self.slack.respond(url, text).await
    }
}

/// Ordered collection of `(Trigger, Listener)` pairs plus one error handler.
pub struct ListenerRegistry {
    listeners: Vec<(Trigger, Listener)>,
    on_error: ErrorHandler,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let triggers: Vec<String> = self.listeners.iter().map(|(t, _)| t.to_string()).collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &triggers)
            .finish_non_exhaustive()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry whose error handler logs the failure and
    /// the raw body.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            on_error: Arc::new(|err, body| {
                error!(error = %err, body = %body, "Listener failed");
            }),
        }
    }

    /// Creates a registry and runs the default groups followed by
    /// `extra_groups`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a group.
    pub fn build(
        config: &Config,
        default_groups: &[RegisterFn],
        extra_groups: &[RegisterFn],
    ) -> Result<Self, ServerError> {
        let mut registry = Self::new();
        for register in default_groups.iter().chain(extra_groups) {
            register(&mut registry, config)?;
        }
        debug!(listener_count = registry.len(), "Listener registry built");
        Ok(registry)
    }

    /// Registers `listener` for `trigger`.
    pub fn on<F, Fut>(&mut self, trigger: Trigger, listener: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        let listener: Listener = Arc::new(move |ctx| listener(ctx).boxed());
        self.listeners.push((trigger, listener));
        self
    }

    /// Registers a message listener; `trigger` is a text or pattern trigger.
    pub fn message<F, Fut>(&mut self, trigger: Trigger, listener: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        debug_assert!(matches!(trigger, Trigger::Text(_) | Trigger::Pattern(_)));
        self.on(trigger, listener)
    }

    /// Registers a slash command listener.
    pub fn command<F, Fut>(&mut self, name: &str, listener: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        self.on(Trigger::command(name), listener)
    }

    /// Registers an Events API listener.
    pub fn event<F, Fut>(&mut self, name: &str, listener: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        self.on(Trigger::event(name), listener)
    }

    /// Replaces the error handler.
    pub fn on_error(&mut self, handler: ErrorHandler) -> &mut Self {
        self.on_error = handler;
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Registered triggers, in order.
    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.listeners.iter().map(|(trigger, _)| trigger)
    }

    /// Runs every listener whose trigger matches, in registration order.
    ///
    /// Returns how many listeners ran.
    #[instrument(
        skip_all,
        fields(
            command = ctx.command(),
            event_type = ctx.event().get("type").and_then(|t| t.as_str()),
        )
    )]
    pub async fn dispatch(&self, ctx: Context) -> usize {
        let mut ran = 0;
        for (trigger, listener) in &self.listeners {
            if !trigger.matches(ctx.body()) {
                continue;
            }
            ran += 1;
            debug!(%trigger, "Running listener");

            let result = AssertUnwindSafe(listener(ctx.clone())).catch_unwind().await;
            let err = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic_info) => {
                    let panic_msg = panic_info
                        .downcast_ref::<String>()
                        .map(String::as_str)
                        .or_else(|| panic_info.downcast_ref::<&str>().copied())
                        .unwrap_or("unknown panic");
                    ServerError::Handler(format!("listener for {trigger} panicked: {panic_msg}"))
                }
            };
            (self.on_error)(&err, ctx.body());
        }

        if ran == 0 {
            debug!("No listener matched");
        }
        ran
    }
}
