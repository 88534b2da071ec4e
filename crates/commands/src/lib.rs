//! Chat command routing.
//!
//! One pipeline for both transports: parse the marker-prefixed text, check
//! authorization, dispatch to an action service, render the typed result into
//! exactly one reply (or none), and deliver it on the transport the command
//! arrived on. Whispers additionally pass an echo filter because some event
//! sources redeliver our own outgoing messages.

pub mod dedup;
pub mod render;
pub mod roster;
pub mod router;
pub mod verbs;

pub use {
    dedup::EchoFilter,
    roster::AdminRoster,
    router::{CommandRouter, InboundMessage},
    verbs::Verb,
};
