//! Builds the Slack client and configures process-wide logging from a
//! resolved [`Config`].

use std::sync::OnceLock;
use std::time::Duration;

use slackbot_core::{Config, SlackCredentials, user_agent};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;
use crate::slack_client::SlackClient;

/// Timeout applied to every Web API request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Level chosen by the first successful [`init_logging`] call.
static LOGGING: OnceLock<LevelFilter> = OnceLock::new();

/// Maps a level name to a filter, case-insensitively. Unknown names map to
/// `INFO`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" | "FATAL" => LevelFilter::ERROR,
        "OFF" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Verbosity for `config`: the configured level in development or debug
/// mode, `WARN` otherwise.
pub fn effective_level(config: &Config) -> LevelFilter {
    if config.is_development() || config.is_debug_enabled() {
        parse_level(&config.log_level())
    } else {
        LevelFilter::WARN
    }
}

/// Installs the global `tracing` subscriber.
///
/// Only the first call has an effect; later calls return the level chosen
/// then. `RUST_LOG` directives, when set, take precedence over the level
/// derived from `config`.
pub fn init_logging(config: &Config) -> LevelFilter {
    *LOGGING.get_or_init(|| {
        let level = effective_level(config);
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true);

        let installed = if config.log_format().eq_ignore_ascii_case("compact") {
            builder.compact().try_init()
        } else {
            builder.try_init()
        };
        if installed.is_err() {
            debug!("Global tracing subscriber already installed, keeping it");
        }
        info!(%level, format = %config.log_format(), "Logging configured");
        level
    })
}

/// Builds the Web API client from the bot token.
///
/// # Errors
///
/// Returns `ServerError::SlackApi` if the HTTP client cannot be constructed
/// (e.g. the TLS backend fails to initialize).
pub fn build_client(credentials: &SlackCredentials) -> Result<SlackClient, ServerError> {
    let http = reqwest::Client::builder()
        .user_agent(user_agent())
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| ServerError::SlackApi(format!("failed to build HTTP client: {e}")))?;
    debug!(user_agent = %user_agent(), "Slack client built");
    Ok(SlackClient::new(http, credentials.bot_token.clone()))
}
