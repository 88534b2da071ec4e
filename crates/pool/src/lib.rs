//! The session pool: lifecycle and routing for all pool-operated game
//! accounts.
//!
//! Each session runs an independent event-driven connection; the pool's own
//! state is a pair of individually synchronized registries (sessions, echo
//! filters) so unrelated sessions never serialize each other's chat handling.

pub mod pool;
pub mod registry;
pub mod session;

pub use {
    pool::{FriendRouteOutcome, NamedAction, SessionPool},
    registry::Registry,
    session::{ConnectionState, Session},
};
