//! Session-scoped action services.
//!
//! Each service wraps one category of operations on a live session client,
//! validates preconditions locally, and reports failures through the closed
//! [`lobbykit_common::ActionError`] taxonomy so the command router can render
//! them without re-deriving context.

pub mod catalog;
pub mod cosmetic;
pub mod party;
pub mod social;

pub use {
    catalog::{CosmeticCatalog, CosmeticItem, CosmeticKind, NullCatalog},
    cosmetic::{BackpackChange, CosmeticService},
    party::PartyService,
    social::SocialService,
};
