//! Narrow capability interfaces over the game session client.
//!
//! The wire protocol itself is out of scope; everything the rest of the
//! system needs from a live session is expressed as a small set of trait
//! objects constructed once at session-launch time. Inbound activity arrives
//! on a broadcast event channel per session instead of ad-hoc callbacks.

pub mod error;
pub mod events;
pub mod session;
pub mod testing;

pub use {
    error::ClientError,
    events::SessionEvent,
    session::{
        ClientConnector, Friend, FriendSession, PartyMember, PartyPrivacy, PartySession,
        SessionClient,
    },
};
