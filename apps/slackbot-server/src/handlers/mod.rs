//! Listener groups registered at startup.
//!
//! Each submodule contributes one registration group:
//! - [`messages`]: keyword and pattern replies to channel messages
//! - [`commands`]: `/echo`, `/joke`, `/ping`, `/about`
//! - [`events`]: mentions, channel joins, reactions, new team members

pub mod commands;
pub mod events;
pub mod messages;

use rand::seq::SliceRandom;

use crate::registry::RegisterFn;

/// Groups every bot runs, in registration order.
pub const DEFAULT_GROUPS: &[RegisterFn] =
    &[messages::register, commands::register, events::register];

/// Picks one canned reply at random.
fn pick(options: &'static [&'static str]) -> &'static str {
    options
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_pick_one_of_the_options() {
        const OPTIONS: &[&str] = &["a", "b", "c"];
        for _ in 0..20 {
            assert!(OPTIONS.contains(&pick(OPTIONS)));
        }
    }

    #[test]
    fn test_should_pick_empty_from_no_options() {
        assert_eq!(pick(&[]), "");
    }
}
