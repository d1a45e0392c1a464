//! Shared application state for the bot.
//!
//! [`AppState`] is passed (as `Arc<AppState>`) to every envelope task. It is
//! built once at startup and never mutated afterwards.

use std::sync::Arc;

use slackbot_core::Config;

use crate::registry::ListenerRegistry;
use crate::slack_client::SlackApi;

/// Shared application state, passed as `Arc<AppState>` to all handlers.
pub struct AppState {
    slack: Arc<dyn SlackApi>,
    config: Arc<Config>,
    registry: ListenerRegistry,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bot_name", &self.config.bot_name())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates a new application state with the given components.
    pub fn new(slack: Arc<dyn SlackApi>, config: Arc<Config>, registry: ListenerRegistry) -> Self {
        Self {
            slack,
            config,
            registry,
        }
    }

    /// Returns the Web API client listeners reply through.
    pub fn slack(&self) -> &Arc<dyn SlackApi> {
        &self.slack
    }

    /// Returns the resolved configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Returns the listener registry.
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }
}
