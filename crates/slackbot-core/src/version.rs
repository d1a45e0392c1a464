//! Build version information.

/// Version of the Slackbot workspace, taken from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the `User-Agent` sent with outbound Slack API requests.
///
/// # Examples
///
/// ```
/// let ua = slackbot_core::user_agent();
/// assert!(ua.starts_with("slackbot/"));
/// assert!(ua.ends_with(slackbot_core::VERSION));
/// ```
pub fn user_agent() -> String {
    format!("slackbot/{VERSION}")
}
