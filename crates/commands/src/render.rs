//! The single place taxonomy errors become user-facing text.
//!
//! Keeping the mapping here means the strings are stable, testable on their
//! own, and action services never carry presentation concerns.

use lobbykit_common::ActionError;

pub fn render_error(err: &ActionError) -> String {
    match err {
        ActionError::NoParty => "Not in a party right now.".into(),
        ActionError::NotFound { query, kind } => format!("No {kind} found for \"{query}\"."),
        ActionError::InvalidArgument { value } => {
            format!("\"{value}\" is not a value I recognize.")
        },
        ActionError::SelfAction { action } => format!("I can't {action} myself."),
        ActionError::MissingParameter { usage, .. } => format!("Usage: {usage}"),
        ActionError::RemoteOperation { detail } => format!("Something went wrong: {detail}"),
        ActionError::CapacityExhausted => "All sessions are at friend capacity right now.".into(),
        ActionError::NoSessionsAvailable => "No sessions are available right now.".into(),
    }
}

pub const HELP_TEXT: &str = "\
Lobby commands:
  !skin <name>            change outfit
  !backpack <name|none>   change or remove backpack
  !pickaxe <name>         change pickaxe
  !emote <name>           play an emote
  !stopemote              stop the emote
  !level <number>         set displayed level
  !ready / !unready       toggle readiness
  !ping                   check the session is alive
Admin commands:
  !leave, !kick <name>, !promote <name>,
  !privacy <public|friends|private>, !add <name>,
  !ban <name>, !unban <name>";
