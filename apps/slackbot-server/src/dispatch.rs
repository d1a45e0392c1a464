//! Envelope parsing, acknowledgement and routing for Socket Mode messages.
//!
//! Slack Socket Mode delivers envelopes over WebSocket. Each envelope has a
//! `type` field indicating the kind of payload (slash command or Events API
//! event). This module parses raw JSON into [`Envelope`] structs, provides
//! the [`Ack`] handle used to acknowledge them, and routes them to the
//! [`ListenerRegistry`](crate::registry::ListenerRegistry).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::ServerError;
use crate::registry::Context;
use crate::state::AppState;

/// A Socket Mode envelope received from Slack.
///
/// Every envelope must be acknowledged within 3 seconds by sending back
/// its `envelope_id`. The `payload` contains type-specific data.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Unique identifier for this envelope, used in acknowledgment.
    pub envelope_id: String,

    /// The type of payload contained in this envelope.
    pub envelope_type: EnvelopeType,

    /// Type-specific payload data.
    pub payload: serde_json::Value,
}

/// The type of a Socket Mode envelope payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeType {
    /// A slash command invocation (e.g., `/echo hi`).
    SlashCommands,

    /// An Events API event (e.g., a message in a channel).
    EventsApi,

    /// Any other envelope type (e.g., `interactive`); acknowledged and dropped.
    Unhandled(String),
}

/// Raw Socket Mode message for initial deserialization.
///
/// Both system messages (`hello`, `disconnect`) and envelopes share this
/// structure; they differ in which fields are present.
#[derive(Debug, Deserialize)]
struct RawSocketMessage {
    #[serde(rename = "type")]
    msg_type: String,

    #[serde(default)]
    envelope_id: Option<String>,

    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Result of parsing a raw Socket Mode message.
#[derive(Debug)]
pub enum ParsedMessage {
    /// A `hello` message confirming connection.
    Hello,

    /// A `disconnect` message requesting reconnection.
    Disconnect,

    /// A business envelope that needs acknowledgment and handling.
    Envelope(Envelope),
}

/// Best-effort extraction of a channel identifier from an envelope payload.
///
/// Tries `channel_id` (slash commands), then `event.channel` (events API).
fn extract_channel(payload: &Option<serde_json::Value>) -> &str {
    payload
        .as_ref()
        .and_then(|p| {
            p.get("channel_id").and_then(|v| v.as_str()).or_else(|| {
                p.get("event")
                    .and_then(|e| e.get("channel"))
                    .and_then(|v| v.as_str())
            })
        })
        .unwrap_or("")
}

/// Best-effort extraction of a user identifier from an envelope payload.
///
/// Tries `user_id` (slash commands), then `event.user` as a string, then
/// `event.user.id` (`team_join` carries a full user object).
fn extract_user(payload: &Option<serde_json::Value>) -> &str {
    payload
        .as_ref()
        .and_then(|p| {
            p.get("user_id").and_then(|v| v.as_str()).or_else(|| {
                let user = p.get("event").and_then(|e| e.get("user"))?;
                user.as_str()
                    .or_else(|| user.get("id").and_then(|v| v.as_str()))
            })
        })
        .unwrap_or("")
}

/// Parses a raw JSON string from the WebSocket into a [`ParsedMessage`].
///
/// Returns `None` for unknown message types (logged as a warning).
///
/// # Errors
///
/// Returns `ServerError::Json` if the frame is not a Socket Mode message.
pub fn parse_message(text: &str) -> Result<Option<ParsedMessage>, ServerError> {
    let raw: RawSocketMessage = serde_json::from_str(text)?;

    match raw.msg_type.as_str() {
        "hello" => {
            info!("Received hello from Slack, connection established");
            Ok(Some(ParsedMessage::Hello))
        }
        "disconnect" => {
            info!("Received disconnect from Slack, will reconnect");
            Ok(Some(ParsedMessage::Disconnect))
        }
        other => {
            let Some(envelope_id) = raw.envelope_id else {
                warn!(msg_type = other, "Unknown Socket Mode message type, ignoring");
                return Ok(None);
            };

            let envelope_type = match other {
                "slash_commands" => EnvelopeType::SlashCommands,
                "events_api" => EnvelopeType::EventsApi,
                _ => EnvelopeType::Unhandled(other.to_string()),
            };

            let channel = extract_channel(&raw.payload);
            let user = extract_user(&raw.payload);

            debug!(
                envelope_id,
                envelope_type = ?envelope_type,
                channel,
                user,
                "Parsed envelope",
            );

            Ok(Some(ParsedMessage::Envelope(Envelope {
                envelope_id,
                envelope_type,
                payload: raw.payload.unwrap_or(serde_json::Value::Null),
            })))
        }
    }
}

/// Acknowledgement handle for one envelope.
///
/// Sending is idempotent: only the first [`send`](Self::send) writes the
/// `{"envelope_id": ...}` frame to the socket writer.
#[derive(Debug, Clone)]
pub struct Ack {
    envelope_id: Arc<str>,
    tx: mpsc::UnboundedSender<String>,
    sent: Arc<AtomicBool>,
}

impl Ack {
    /// Creates an ack handle writing frames to `tx`.
    pub fn new(envelope_id: &str, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            envelope_id: Arc::from(envelope_id),
            tx,
            sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Acknowledges the envelope.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::WebSocket` if the connection the envelope
    /// arrived on has already closed.
    pub fn send(&self) -> Result<(), ServerError> {
        if self.sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let frame = serde_json::json!({ "envelope_id": &*self.envelope_id }).to_string();
        self.tx.send(frame).map_err(|_| {
            ServerError::WebSocket(format!(
                "connection closed before envelope {} was acknowledged",
                self.envelope_id
            ))
        })
    }

    /// Whether the envelope has been acknowledged.
    pub fn is_sent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }
}

/// Message event fields needed to filter out the bot's own traffic.
#[derive(Debug, Deserialize)]
struct MessageFilter {
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

/// Returns why an event should be skipped, if it should.
fn skip_reason(event: &serde_json::Value) -> Option<String> {
    if event.get("type").and_then(|t| t.as_str()) != Some("message") {
        return None;
    }
    let filter = MessageFilter::deserialize(event).ok()?;
    if filter.bot_id.is_some() {
        return Some("bot message".into());
    }
    filter.subtype.map(|s| format!("message subtype {s}"))
}

/// Dispatches an envelope to the listener registry.
///
/// Events are acknowledged before any listener runs; slash command
/// listeners acknowledge themselves. Whatever is still unacknowledged once
/// the listeners finish is acknowledged here so Slack does not time out.
#[instrument(
    skip(state, envelope, ack),
    fields(
        envelope_id = %envelope.envelope_id,
        envelope_type = ?envelope.envelope_type,
    )
)]
pub async fn dispatch(state: Arc<AppState>, envelope: Envelope, ack: Ack) {
    debug!("Dispatching envelope");

    match envelope.envelope_type {
        EnvelopeType::SlashCommands => {
            let ctx = Context::new(
                Arc::clone(state.slack()),
                Arc::clone(state.config()),
                envelope.payload,
                ack.clone(),
            );
            state.registry().dispatch(ctx).await;
        }
        EnvelopeType::EventsApi => {
            if let Err(e) = ack.send() {
                warn!(error = %e, "Failed to acknowledge event");
            }
            let skip = envelope.payload.get("event").and_then(skip_reason);
            if let Some(reason) = skip {
                debug!(reason, "Skipping event");
                return;
            }
            let ctx = Context::new(
                Arc::clone(state.slack()),
                Arc::clone(state.config()),
                envelope.payload,
                ack.clone(),
            );
            state.registry().dispatch(ctx).await;
        }
        EnvelopeType::Unhandled(ref kind) => {
            debug!(kind, "No listeners for envelope type");
        }
    }

    if !ack.is_sent() {
        warn!("Envelope was not acknowledged by any listener, acknowledging now");
        if let Err(e) = ack.send() {
            warn!(error = %e, "Failed to acknowledge envelope");
        }
    }
}
