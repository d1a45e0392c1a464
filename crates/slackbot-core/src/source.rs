//! Raw configuration sources.
//!
//! A [`ConfigSource`] produces the nested key/value tree the rest of the
//! crate works with. Files are parsed as JSON or YAML depending on their
//! extension ([`ConfigFormat`]); the environment source builds the same
//! schema from `SLACK_*` and related variables with documented defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ConfigError;
use crate::version::VERSION;

/// Conventional config filenames, probed in this order.
pub const DEFAULT_CONFIG_FILES: [&str; 5] = [
    "config.json",
    "config.yaml",
    "config.yml",
    "settings.json",
    ".config.json",
];

/// Structured file format, chosen by file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use slackbot_core::ConfigFormat;
///
/// assert_eq!(ConfigFormat::from_path(Path::new("config.yml")), ConfigFormat::Yaml);
/// assert_eq!(ConfigFormat::from_path(Path::new("settings.json")), ConfigFormat::Json);
/// assert_eq!(ConfigFormat::from_path(Path::new(".config")), ConfigFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON object (default for any non-YAML extension).
    Json,
    /// YAML mapping (`.yaml` / `.yml`).
    Yaml,
}

impl ConfigFormat {
    /// Infers the format from the path's extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }

    /// Parses file contents into a mapping.
    ///
    /// # Errors
    ///
    /// Returns the parser diagnostic when the text is malformed or its root
    /// is not a mapping.
    pub fn parse(self, content: &str) -> Result<Map<String, Value>, String> {
        let value: Value = match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
        };
        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Err("document is empty".into()),
            other => Err(format!(
                "top-level value must be a mapping, found {}",
                kind_of(&other)
            )),
        }
    }

    /// Renders a tree in this format.
    ///
    /// JSON is pretty-printed with two-space indentation; YAML uses block
    /// style.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if the serializer rejects the tree.
    pub fn render(self, tree: &Map<String, Value>) -> Result<String, ConfigError> {
        match self {
            Self::Json => {
                let mut out = serde_json::to_string_pretty(tree)
                    .map_err(|e| ConfigError::Serialize(e.to_string()))?;
                out.push('\n');
                Ok(out)
            }
            Self::Yaml => {
                serde_yaml::to_string(tree).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Where environment variables are read from.
///
/// `Process` reads the real process environment, loading a `.env` file from
/// the working directory first. `Fixed` serves a predetermined set of
/// variables and never touches the process.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment (after loading `.env`, if present).
    #[default]
    Process,
    /// A fixed variable set.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    /// Builds a fixed source from key/value pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use slackbot_core::EnvSource;
    ///
    /// let env = EnvSource::fixed([("BOT_NAME", "Ada")]);
    /// assert_eq!(env.var("BOT_NAME").as_deref(), Some("Ada"));
    /// assert_eq!(env.var("DEBUG"), None);
    /// ```
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the value of `key`, or `None` when unset or not valid UTF-8.
    pub fn var(&self, key: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
        }
    }

    fn prepare(&self) {
        if let Self::Process = self {
            match dotenvy::dotenv() {
                Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
                Err(e) if e.not_found() => {}
                Err(e) => debug!(error = %e, "Ignoring unreadable .env file"),
            }
        }
    }
}

/// A single origin of raw settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A JSON or YAML file.
    File(PathBuf),
    /// Environment variables with defaults.
    Environment,
}

impl ConfigSource {
    /// Loads the raw tree from this source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse` for file sources.
    /// The environment source never fails.
    pub fn load(&self, env: &EnvSource) -> Result<Map<String, Value>, ConfigError> {
        match self {
            Self::File(path) => load_file(path),
            Self::Environment => Ok(tree_from_env(env)),
        }
    }
}

fn load_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigFormat::from_path(path)
        .parse(&content)
        .map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
}

/// Accepts the usual spellings of "on" for boolean environment flags.
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Builds the full configuration schema from environment variables.
///
/// Credentials map to `null` when unset so that validation reports them as
/// missing rather than malformed.
pub fn tree_from_env(env: &EnvSource) -> Map<String, Value> {
    env.prepare();

    let debug = env.var("DEBUG").is_some_and(|v| is_truthy(&v));
    let tree = json!({
        "slack": {
            "bot_token": env.var("SLACK_BOT_TOKEN"),
            "app_token": env.var("SLACK_APP_TOKEN"),
        },
        "environment": env.var("ENVIRONMENT").unwrap_or_else(|| "production".into()),
        "bot": {
            "name": env.var("BOT_NAME").unwrap_or_else(|| "Slackbot".into()),
            "version": VERSION,
            "debug": debug,
        },
        "features": {
            "welcome_messages": true,
            "reaction_responses": true,
            "joke_commands": true,
        },
        "logging": {
            "level": env.var("LOG_LEVEL").unwrap_or_else(|| "INFO".into()),
            "format": "full",
        },
    });

    match tree {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_detect_yaml_extensions_case_insensitively() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YAML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("noext")), ConfigFormat::Json);
    }

    #[test]
    fn test_should_parse_yaml_mapping() {
        let yaml = "slack:\n  bot_token: xoxb-1\nbot:\n  debug: true\n";
        let map = ConfigFormat::Yaml.parse(yaml).expect("parse");
        assert_eq!(map["slack"]["bot_token"], "xoxb-1");
        assert_eq!(map["bot"]["debug"], true);
    }

    #[test]
    fn test_should_reject_non_mapping_root() {
        let err = ConfigFormat::Json.parse("[1, 2]").unwrap_err();
        assert!(err.contains("mapping"));
        assert!(ConfigFormat::Yaml.parse("").is_err());
        assert!(ConfigFormat::Yaml.parse("just a string").is_err());
    }

    #[test]
    fn test_should_report_malformed_json() {
        assert!(ConfigFormat::Json.parse("{ not json").is_err());
    }

    #[test]
    fn test_should_build_defaults_from_empty_env() {
        let tree = tree_from_env(&EnvSource::fixed(Vec::<(String, String)>::new()));
        assert!(tree["slack"]["bot_token"].is_null());
        assert!(tree["slack"]["app_token"].is_null());
        assert_eq!(tree["environment"], "production");
        assert_eq!(tree["bot"]["name"], "Slackbot");
        assert_eq!(tree["bot"]["version"], VERSION);
        assert_eq!(tree["bot"]["debug"], false);
        assert_eq!(tree["features"]["joke_commands"], true);
        assert_eq!(tree["logging"]["level"], "INFO");
    }

    #[test]
    fn test_should_read_overrides_from_env() {
        let env = EnvSource::fixed([
            ("SLACK_BOT_TOKEN", "xoxb-abc"),
            ("SLACK_APP_TOKEN", "xapp-def"),
            ("ENVIRONMENT", "development"),
            ("BOT_NAME", "Ada"),
            ("DEBUG", "TRUE"),
            ("LOG_LEVEL", "DEBUG"),
        ]);
        let tree = tree_from_env(&env);
        assert_eq!(tree["slack"]["bot_token"], "xoxb-abc");
        assert_eq!(tree["slack"]["app_token"], "xapp-def");
        assert_eq!(tree["environment"], "development");
        assert_eq!(tree["bot"]["name"], "Ada");
        assert_eq!(tree["bot"]["debug"], true);
        assert_eq!(tree["logging"]["level"], "DEBUG");
    }

    #[test]
    fn test_should_treat_unknown_debug_values_as_false() {
        for value in ["false", "0", "no", "maybe", ""] {
            let tree = tree_from_env(&EnvSource::fixed([("DEBUG", value)]));
            assert_eq!(tree["bot"]["debug"], false, "DEBUG={value}");
        }
        for value in ["1", "yes", "On", " true "] {
            let tree = tree_from_env(&EnvSource::fixed([("DEBUG", value)]));
            assert_eq!(tree["bot"]["debug"], true, "DEBUG={value}");
        }
    }

    #[test]
    fn test_should_load_file_source() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"environment": "staging"}"#).expect("write");

        let tree = ConfigSource::File(path)
            .load(&EnvSource::default())
            .expect("load");
        assert_eq!(tree["environment"], "staging");
    }

    #[test]
    fn test_should_error_on_unreadable_file_source() {
        let err = ConfigSource::File(PathBuf::from("/nonexistent/config.json"))
            .load(&EnvSource::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
