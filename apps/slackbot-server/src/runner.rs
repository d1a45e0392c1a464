//! Startup sequence and operator commands.
//!
//! [`run`] resolves configuration, configures logging, validates the Slack
//! credentials, checks them against `auth.test`, builds the listener
//! registry and then drives the Socket Mode loop until SIGINT/SIGTERM.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use slackbot_core::{Config, ConfigOrigin, ConfigResolver, SlackCredentials, mask_token};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::error::ServerError;
use crate::factory;
use crate::handlers::DEFAULT_GROUPS;
use crate::registry::{ListenerRegistry, RegisterFn};
use crate::slack_client::{BotIdentity, SlackApi};
use crate::socket::SocketClient;
use crate::state::AppState;

/// Feature toggles reported by `check`.
const FEATURES: [&str; 3] = ["welcome_messages", "reaction_responses", "joke_commands"];

/// Resolves the configuration and sets up logging from it.
///
/// # Errors
///
/// Fails if an explicit config path does not exist.
pub fn load_config(
    resolver: &ConfigResolver,
    config_path: Option<&Path>,
) -> anyhow::Result<Config> {
    let config = resolver
        .resolve(config_path)
        .context("Failed to resolve configuration")?;
    factory::init_logging(&config);
    log_origin(&config);
    Ok(config)
}

/// Logs where the configuration came from.
fn log_origin(config: &Config) {
    match config.origin() {
        ConfigOrigin::File(path) => {
            info!(path = %path.display(), "Configuration loaded from file");
        }
        ConfigOrigin::Environment => {
            info!("Configuration loaded from environment variables");
        }
        ConfigOrigin::EnvironmentFallback { path, reason } => {
            warn!(
                path = %path.display(),
                reason,
                "Config file unusable, configuration loaded from environment variables"
            );
        }
    }
}

/// Runs the bot until a shutdown signal arrives.
///
/// `extra_groups` are registered after [`DEFAULT_GROUPS`].
///
/// # Errors
///
/// Fails when the configuration cannot be resolved, the credentials are
/// missing or malformed, or Slack rejects them.
pub async fn run(
    resolver: &ConfigResolver,
    config_path: Option<&Path>,
    extra_groups: &[RegisterFn],
) -> anyhow::Result<()> {
    let config = load_config(resolver, config_path)?;
    let credentials = config
        .validate_required()
        .context("Slack credentials are not configured correctly")?;

    info!(
        bot = %config.bot_name(),
        version = %config.bot_version(),
        environment = %config.environment(),
        "Starting bot"
    );

    let client = factory::build_client(&credentials)?;
    let slack: Arc<dyn SlackApi> = Arc::new(client.clone());
    startup_checks(slack.as_ref(), &config)
        .await
        .context("Slack rejected the bot token")?;

    let registry = ListenerRegistry::build(&config, DEFAULT_GROUPS, extra_groups)
        .context("Failed to register listeners")?;
    if registry.is_empty() {
        warn!("No listeners registered, the bot will only acknowledge envelopes");
    }
    for trigger in registry.triggers() {
        debug!(%trigger, "Listener registered");
    }
    info!(listener_count = registry.len(), "Listeners registered");

    let state = Arc::new(AppState::new(slack, Arc::new(config), registry));
    let shutdown_rx = spawn_shutdown_listener();
    let socket = SocketClient::new(credentials.app_token.clone(), client);

    info!("Starting Socket Mode connection...");
    socket
        .run(
            move |envelope, ack| {
                let state = Arc::clone(&state);
                async move {
                    dispatch::dispatch(state, envelope, ack).await;
                }
            },
            shutdown_rx,
        )
        .await;

    info!("Bot shut down cleanly");
    Ok(())
}

/// Confirms the bot token with `auth.test` and, in debug mode, reports the
/// channels the bot belongs to.
///
/// # Errors
///
/// Returns the `auth.test` failure. Listing channels is best-effort.
pub async fn startup_checks(
    slack: &dyn SlackApi,
    config: &Config,
) -> Result<BotIdentity, ServerError> {
    let identity = slack.auth_test().await?;
    info!(
        user_id = identity.user_id,
        user = ?identity.user,
        bot_id = ?identity.bot_id,
        team = ?identity.team,
        "Authenticated with Slack"
    );

    if config.is_debug_enabled() {
        match slack.list_conversations().await {
            Ok(conversations) => {
                let member_of = conversations.iter().filter(|c| c.is_member).count();
                info!(visible = conversations.len(), member_of, "Channel membership");
            }
            Err(e) => warn!(error = %e, "Could not list channels"),
        }
    }
    Ok(identity)
}

/// Resolves and validates the configuration, then prints a masked summary.
///
/// # Errors
///
/// Fails when resolution or validation fails.
pub fn check(resolver: &ConfigResolver, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(resolver, config_path)?;
    let credentials = config
        .validate_required()
        .context("Slack credentials are not configured correctly")?;
    print!("{}", summary(&config, &credentials));
    Ok(())
}

/// Writes the resolved configuration to `target`.
///
/// # Errors
///
/// Fails when resolution or writing fails.
pub fn save_config(
    resolver: &ConfigResolver,
    config_path: Option<&Path>,
    target: &Path,
) -> anyhow::Result<()> {
    let config = load_config(resolver, config_path)?;
    let written = config
        .save(Some(target))
        .with_context(|| format!("Failed to save configuration to {}", target.display()))?;
    println!("Configuration saved to {}", written.display());
    Ok(())
}

/// Human-readable configuration summary with masked tokens.
pub fn summary(config: &Config, credentials: &SlackCredentials) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Configuration source: {}", config.origin());
    let _ = writeln!(out, "Bot: {} v{}", config.bot_name(), config.bot_version());
    let _ = writeln!(out, "Environment: {}", config.environment());
    let _ = writeln!(out, "Debug: {}", config.is_debug_enabled());
    let _ = writeln!(out, "Bot token: {}", mask_token(&credentials.bot_token));
    let _ = writeln!(out, "App token: {}", mask_token(&credentials.app_token));
    for feature in FEATURES {
        let state = if config.feature_enabled(feature) { "on" } else { "off" };
        let _ = writeln!(out, "Feature {feature}: {state}");
    }
    out
}

/// Spawns a task that flips the returned channel to `true` on SIGINT or
/// SIGTERM.
fn spawn_shutdown_listener() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });
    shutdown_rx
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
                return;
            }
            Err(e) => warn!(
                error = %e,
                "Failed to register SIGTERM handler, waiting for SIGINT only"
            ),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for SIGINT, shutdown must be forced");
        std::future::pending::<()>().await;
    }
    info!("Received SIGINT, shutting down...");
}
