//! Shared data model and error taxonomy for lobbykit.
//!
//! Everything here is consumed by at least two other crates: the credential
//! types flow between the store, the session pool, and the auth flow, and
//! `ActionError` is the single closed taxonomy every session-scoped operation
//! reports failures through.

pub mod error;
pub mod types;

pub use {
    error::ActionError,
    types::{AccountCredential, ChatTransport, DeviceAuth, UserLink},
};
