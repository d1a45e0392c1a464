//! Error types for configuration handling.
//!
//! Defines `ConfigError` as the error type for every operation within
//! `slackbot-core`.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for slackbot-core operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A credential does not carry its expected prefix.
    #[error("Invalid {key} format. Should start with '{prefix}'")]
    InvalidToken {
        /// Setting name, e.g. `bot_token`.
        key: &'static str,
        /// Expected prefix, e.g. `xoxb-`.
        prefix: &'static str,
    },

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A config file exists but could not be read.
    #[error("Cannot read config at {}: {source}", path.display())]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A config file was read but its contents are not a valid tree.
    #[error("Invalid config at {}: {message}", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// Writing a config file failed.
    #[error("Cannot write config to {}: {source}", path.display())]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The in-memory tree could not be rendered in the target format.
    #[error("Cannot serialize config: {0}")]
    Serialize(String),
}
