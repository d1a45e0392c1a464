//! Configuration source selection.
//!
//! [`ConfigResolver`] decides which single source the configuration comes
//! from: an explicit path, the first conventional file found in the search
//! directory, or the environment. A file that exists but cannot be read or
//! parsed is logged and replaced by the environment source instead of
//! aborting startup.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{Config, ConfigOrigin};
use crate::error::ConfigError;
use crate::source::{ConfigSource, DEFAULT_CONFIG_FILES, EnvSource};

/// Resolves a [`Config`] from a file or the environment.
///
/// # Examples
///
/// ```
/// use slackbot_core::{ConfigOrigin, ConfigResolver, EnvSource};
///
/// let dir = tempfile::tempdir().unwrap();
/// let resolver = ConfigResolver::new()
///     .with_search_dir(dir.path())
///     .with_env(EnvSource::fixed([("BOT_NAME", "Ada")]));
///
/// let config = resolver.resolve(None).unwrap();
/// assert_eq!(config.origin(), &ConfigOrigin::Environment);
/// assert_eq!(config.bot_name(), "Ada");
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    search_dir: PathBuf,
    env: EnvSource,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Creates a resolver that probes the working directory and reads the
    /// process environment.
    pub fn new() -> Self {
        Self {
            search_dir: PathBuf::from("."),
            env: EnvSource::Process,
        }
    }

    /// Probes `dir` instead of the working directory.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// Reads environment variables from `env`.
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Returns the first conventional config file present in the search
    /// directory.
    pub fn find_config_file(&self) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| self.search_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Resolves the configuration.
    ///
    /// With `explicit_path`, that file must exist. Without it, the
    /// conventional filenames are probed in order and the environment is
    /// used when none exists. A found file that fails to load falls back to
    /// the environment; the failure is logged and recorded in
    /// [`ConfigOrigin::EnvironmentFallback`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if `explicit_path` does not exist.
    pub fn resolve(&self, explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => self.find_config_file(),
        };

        let Some(path) = path else {
            warn!("Config file not found, falling back to environment variables");
            return Ok(self.from_env(ConfigOrigin::Environment));
        };

        match ConfigSource::File(path.clone()).load(&self.env) {
            Ok(tree) => {
                info!(path = %path.display(), "Loaded configuration");
                Ok(Config::new(tree, ConfigOrigin::File(path)))
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Error loading config file, falling back to environment variables"
                );
                Ok(self.from_env(ConfigOrigin::EnvironmentFallback {
                    path,
                    reason: e.to_string(),
                }))
            }
        }
    }

    fn from_env(&self, origin: ConfigOrigin) -> Config {
        let tree = crate::source::tree_from_env(&self.env);
        Config::new(tree, origin)
    }
}
