//! Thin async client for the Slack Web API methods used by the bot.
//!
//! [`SlackApi`] is the seam listeners talk to; [`SlackClient`] is the
//! production implementation wrapping `reqwest::Client` with the bot token.
//! Tests substitute a recording mock.

use async_trait::async_trait;
use serde::Deserialize;
use slackbot_core::mask_token;
use tracing::{debug, warn};

use crate::error::ServerError;

/// Base URL for Slack Web API.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Page size requested from `conversations.list`.
const CONVERSATIONS_PAGE_LIMIT: &str = "200";

/// Identity of the bot user as reported by `auth.test`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotIdentity {
    /// Bot's user ID (the `<@U...>` it is mentioned with).
    pub user_id: String,
    /// Bot's user name.
    pub user: Option<String>,
    /// Bot ID, when the token belongs to a bot user.
    pub bot_id: Option<String>,
    /// Workspace name.
    pub team: Option<String>,
}

/// A conversation entry from `conversations.list`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Conversation ID.
    pub id: String,
    /// Channel name (absent for DMs).
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the bot is a member.
    #[serde(default)]
    pub is_member: bool,
}

/// Outbound Slack operations available to listeners.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// envelope tasks. Every method may fail with `ServerError::SlackApi`.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Posts a plain-text message to a channel. Returns the message `ts`.
    async fn post_message(&self, channel: &str, text: &str) -> Result<String, ServerError>;

    /// Replies to a slash command through its `response_url`.
    async fn respond(&self, response_url: &str, text: &str) -> Result<(), ServerError>;

    /// Opens (or reuses) a direct message channel with `user`. Returns its ID.
    async fn open_direct_message(&self, user: &str) -> Result<String, ServerError>;

    /// Lists the public and private channels visible to the bot.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ServerError>;

    /// Checks the bot token and returns the bot's identity.
    async fn auth_test(&self) -> Result<BotIdentity, ServerError>;
}

/// Production [`SlackApi`] implementation over HTTPS.
///
/// All methods authenticate with the bot token (`xoxb-...`) except
/// [`connections_open`](Self::connections_open) which uses the app-level
/// token (`xapp-...`) passed as a parameter.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &mask_token(&self.bot_token))
            .finish_non_exhaustive()
    }
}

/// Generic Slack API response envelope for deserialization.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    channel: Option<ChannelField>,
    #[serde(default)]
    channels: Vec<Conversation>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    team: Option<String>,
}

/// `channel` is a bare ID in `chat.postMessage` replies and an object in
/// `conversations.open` replies.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChannelField {
    Id(String),
    Object { id: String },
}

impl ChannelField {
    fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

impl SlackClient {
    /// Creates a client from a prepared `reqwest::Client` and the bot token.
    pub fn new(http: reqwest::Client, bot_token: String) -> Self {
        Self { http, bot_token }
    }

    /// Opens a Socket Mode connection and returns the WebSocket URL.
    ///
    /// Uses the app-level token (`xapp-...`) rather than the bot token.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn connections_open(&self, app_token: &str) -> Result<String, ServerError> {
        debug!("Opening Socket Mode connection");
        let resp = self
            .http
            .post(format!("{SLACK_API_BASE}/apps.connections.open"))
            .bearer_auth(app_token)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|e| {
                ServerError::SlackApi(format!("apps.connections.open request failed: {e}"))
            })?;

        let api_resp = check_response("apps.connections.open", resp).await?;
        api_resp.url.ok_or_else(|| {
            ServerError::SlackApi("apps.connections.open response missing 'url'".into())
        })
    }

    /// Sends a JSON POST request to a Slack Web API method using the bot token.
    async fn call_json(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<SlackApiResponse, ServerError> {
        let resp = self
            .http
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} request failed: {e}")))?;
        check_response(method, resp).await
    }

    /// Sends a form-encoded POST request, for read methods that do not
    /// accept JSON bodies.
    async fn call_form(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<SlackApiResponse, ServerError> {
        let resp = self
            .http
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(&self.bot_token)
            .form(params)
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} request failed: {e}")))?;
        check_response(method, resp).await
    }
}

/// Parses a Web API response and turns `ok: false` into an error.
async fn check_response(
    method: &str,
    resp: reqwest::Response,
) -> Result<SlackApiResponse, ServerError> {
    let api_resp: SlackApiResponse = resp
        .json()
        .await
        .map_err(|e| ServerError::SlackApi(format!("{method} response parse failed: {e}")))?;

    if !api_resp.ok {
        let error_msg = api_resp.error.as_deref().unwrap_or("unknown");
        warn!(method, error = error_msg, "Slack API error");
        return Err(ServerError::SlackApi(format!("{method} error: {error_msg}")));
    }

    Ok(api_resp)
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<String, ServerError> {
        let body = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        debug!(channel, "Posting message");
        let resp = self.call_json("chat.postMessage", &body).await?;
        let ts = resp.ts.ok_or_else(|| {
            ServerError::SlackApi("chat.postMessage response missing 'ts'".into())
        })?;
        debug!(channel = resp.channel.as_ref().map(ChannelField::id), ts = %ts, "Message posted");
        Ok(ts)
    }

    async fn respond(&self, response_url: &str, text: &str) -> Result<(), ServerError> {
        let body = serde_json::json!({
            "text": text,
            "response_type": "ephemeral",
        });
        debug!("Responding via response_url");
        let resp = self
            .http
            .post(response_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("response_url request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ServerError::SlackApi(format!(
                "response_url returned HTTP {status}"
            )));
        }
        Ok(())
    }

    async fn open_direct_message(&self, user: &str) -> Result<String, ServerError> {
        let body = serde_json::json!({ "users": user });
        debug!(user, "Opening direct message channel");
        let resp = self.call_json("conversations.open", &body).await?;
        match resp.channel {
            Some(ChannelField::Object { id }) => Ok(id),
            _ => Err(ServerError::SlackApi(
                "conversations.open response missing 'channel.id'".into(),
            )),
        }
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ServerError> {
        let mut conversations = Vec::new();
        let mut cursor = String::new();
        loop {
            let resp = {
                let mut params = vec![
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", CONVERSATIONS_PAGE_LIMIT),
                ];
                if !cursor.is_empty() {
                    params.push(("cursor", cursor.as_str()));
                }
                self.call_form("conversations.list", &params).await?
            };
            conversations.extend(resp.channels);

            match resp.response_metadata {
                Some(meta) if !meta.next_cursor.is_empty() => cursor = meta.next_cursor,
                _ => break,
            }
        }
        debug!(count = conversations.len(), "Listed conversations");
        Ok(conversations)
    }

    async fn auth_test(&self) -> Result<BotIdentity, ServerError> {
        let resp = self.call_form("auth.test", &[]).await?;
        let user_id = resp
            .user_id
            .ok_or_else(|| ServerError::SlackApi("auth.test response missing 'user_id'".into()))?;
        Ok(BotIdentity {
            user_id,
            user: resp.user,
            bot_id: resp.bot_id,
            team: resp.team,
        })
    }
}
