//! Slackbot Core
//!
//! Configuration handling for the Slackbot server. Resolves a single
//! configuration tree from a JSON/YAML file or the process environment,
//! exposes dotted-path lookups over it, and validates the Slack credentials
//! the server needs before it connects.
//!
//! # Architecture
//!
//! - [`ConfigResolver`] picks a source (explicit path, probed file, or environment)
//! - [`ConfigSource`] / [`ConfigFormat`] read raw settings into a nested mapping
//! - [`Config`] holds the resolved tree, typed accessors, `deep_merge` and `save`
//! - [`SlackCredentials`] is the validated bot/app token pair
//! - [`ConfigError`] covers every failure in this crate

pub mod config;
mod error;
pub mod resolver;
pub mod source;
pub mod version;

pub use config::{Config, ConfigOrigin, SlackCredentials, mask_token};
pub use error::ConfigError;
pub use resolver::ConfigResolver;
pub use source::{ConfigFormat, ConfigSource, DEFAULT_CONFIG_FILES, EnvSource};
pub use version::{VERSION, user_agent};
